use thiserror::Error;

use crate::target::Destination;
use crate::world::BlockId;

// ---------------------------------------------------------------------------
// Layered navigation settings
// ---------------------------------------------------------------------------
//
// Three scopes chained Commands -> Task -> Subtask. Commands is the root and
// always fully populated; a child leaves a field unset to read through to
// its parent. Coarse policy ("ignore asteroids for this command run") lives
// high in the chain, maneuver-specific overrides low, and neither clobbers
// the other.

/// Movement-permission bitset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Permissions(u8);

impl Permissions {
    pub const ROTATE: Permissions = Permissions(1 << 0);
    pub const MOVE: Permissions = Permissions(1 << 1);
    /// Pathfinder may deviate from the straight-line course.
    pub const CHANGE_COURSE: Permissions = Permissions(1 << 2);

    pub const NONE: Permissions = Permissions(0);
    pub const ALL: Permissions =
        Permissions(Self::ROTATE.0 | Self::MOVE.0 | Self::CHANGE_COURSE.0);

    pub fn contains(self, other: Permissions) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn with(self, other: Permissions) -> Permissions {
        Permissions(self.0 | other.0)
    }

    pub fn without(self, other: Permissions) -> Permissions {
        Permissions(self.0 & !other.0)
    }
}

/// Which navigator currently drives the ship.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavMode {
    Idle,
    Cruise,
    Approach,
    Landing,
}

/// One settings scope. Unset fields read through to the parent scope.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    pub nav_block: Option<BlockId>,
    pub mode: Option<NavMode>,
    pub permissions: Option<Permissions>,
    pub destination: Option<Destination>,
    pub destination_radius: Option<f64>,
    pub speed_target: Option<f64>,
    pub ignore_asteroids: Option<bool>,
    pub jump_to_destination: Option<bool>,
}

impl Scope {
    /// A fully-populated root scope with stock defaults.
    pub fn root(nav_block: BlockId) -> Self {
        Self {
            nav_block: Some(nav_block),
            mode: Some(NavMode::Idle),
            permissions: Some(Permissions::ALL),
            destination: Some(Destination::None),
            destination_radius: Some(100.0),
            speed_target: Some(100.0),
            ignore_asteroids: Some(false),
            jump_to_destination: Some(false),
        }
    }

    fn missing_field(&self) -> Option<&'static str> {
        if self.nav_block.is_none() {
            return Some("nav_block");
        }
        if self.mode.is_none() {
            return Some("mode");
        }
        if self.permissions.is_none() {
            return Some("permissions");
        }
        if self.destination.is_none() {
            return Some("destination");
        }
        if self.destination_radius.is_none() {
            return Some("destination_radius");
        }
        if self.speed_target.is_none() {
            return Some("speed_target");
        }
        if self.ignore_asteroids.is_none() {
            return Some("ignore_asteroids");
        }
        if self.jump_to_destination.is_none() {
            return Some("jump_to_destination");
        }
        None
    }
}

/// Scope selector for writes and resets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeLevel {
    Commands,
    Task,
    Subtask,
}

#[derive(Debug, Error)]
pub enum SettingsError {
    /// A root scope missing a default is a programming error; initialization
    /// must abort rather than limp along with partial defaults.
    #[error("root settings scope is missing a default for `{0}`")]
    IncompleteRoot(&'static str),
}

/// The full chain: root defaults plus two override scopes.
#[derive(Debug, Clone)]
pub struct NavSettings {
    root_template: Scope,
    commands: Scope,
    task: Scope,
    subtask: Scope,
}

impl NavSettings {
    /// Chain rooted at stock defaults for the given controlling block.
    pub fn new(nav_block: BlockId) -> Self {
        let root = Scope::root(nav_block);
        Self {
            root_template: root.clone(),
            commands: root,
            task: Scope::default(),
            subtask: Scope::default(),
        }
    }

    /// Chain rooted at a caller-supplied scope, which must be complete.
    pub fn with_root(root: Scope) -> Result<Self, SettingsError> {
        if let Some(field) = root.missing_field() {
            return Err(SettingsError::IncompleteRoot(field));
        }
        Ok(Self {
            root_template: root.clone(),
            commands: root,
            task: Scope::default(),
            subtask: Scope::default(),
        })
    }

    pub fn scope_mut(&mut self, level: ScopeLevel) -> &mut Scope {
        match level {
            ScopeLevel::Commands => &mut self.commands,
            ScopeLevel::Task => &mut self.task,
            ScopeLevel::Subtask => &mut self.subtask,
        }
    }

    // --- resets: a fresh scope discards overrides at that level and below ---

    pub fn on_start_of_commands(&mut self) {
        self.commands = self.root_template.clone();
        self.on_task_complete();
    }

    pub fn on_task_complete(&mut self) {
        self.task = Scope::default();
        self.on_subtask_complete();
    }

    pub fn on_subtask_complete(&mut self) {
        self.subtask = Scope::default();
    }

    // --- resolved reads (Subtask -> Task -> Commands) ---

    fn resolve<T: Copy>(&self, get: impl Fn(&Scope) -> Option<T>) -> T {
        get(&self.subtask)
            .or_else(|| get(&self.task))
            .or_else(|| get(&self.commands))
            .expect("root scope is fully populated")
    }

    pub fn nav_block(&self) -> BlockId {
        self.resolve(|s| s.nav_block)
    }

    pub fn mode(&self) -> NavMode {
        self.resolve(|s| s.mode)
    }

    pub fn permissions(&self) -> Permissions {
        self.resolve(|s| s.permissions)
    }

    pub fn destination(&self) -> &Destination {
        self.subtask
            .destination
            .as_ref()
            .or(self.task.destination.as_ref())
            .or(self.commands.destination.as_ref())
            .expect("root scope is fully populated")
    }

    pub fn destination_radius(&self) -> f64 {
        self.resolve(|s| s.destination_radius)
    }

    pub fn speed_target(&self) -> f64 {
        self.resolve(|s| s.speed_target)
    }

    pub fn ignore_asteroids(&self) -> bool {
        self.resolve(|s| s.ignore_asteroids)
    }

    pub fn jump_to_destination(&self) -> bool {
        self.resolve(|s| s.jump_to_destination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    fn settings() -> NavSettings {
        NavSettings::new(BlockId(1))
    }

    #[test]
    fn unset_fields_read_through_to_root() {
        let nav = settings();
        assert_eq!(nav.speed_target(), 100.0);
        assert_eq!(nav.destination_radius(), 100.0);
        assert!(!nav.ignore_asteroids());
        assert_eq!(nav.permissions(), Permissions::ALL);
    }

    #[test]
    fn deepest_override_wins() {
        let mut nav = settings();
        nav.scope_mut(ScopeLevel::Task).speed_target = Some(50.0);
        assert_eq!(nav.speed_target(), 50.0);
        nav.scope_mut(ScopeLevel::Subtask).speed_target = Some(5.0);
        assert_eq!(nav.speed_target(), 5.0);
        // Other fields still read through.
        assert_eq!(nav.destination_radius(), 100.0);
    }

    #[test]
    fn task_reset_discards_task_and_subtask_overrides() {
        let mut nav = settings();
        nav.scope_mut(ScopeLevel::Commands).ignore_asteroids = Some(true);
        nav.scope_mut(ScopeLevel::Task).speed_target = Some(25.0);
        nav.scope_mut(ScopeLevel::Subtask).destination_radius = Some(1.0);

        nav.on_task_complete();

        assert_eq!(nav.speed_target(), 100.0);
        assert_eq!(nav.destination_radius(), 100.0);
        // Command-level policy survives a task reset.
        assert!(nav.ignore_asteroids());
    }

    #[test]
    fn start_of_commands_restores_defaults() {
        let mut nav = settings();
        nav.scope_mut(ScopeLevel::Commands).speed_target = Some(10.0);
        nav.on_start_of_commands();
        assert_eq!(nav.speed_target(), 100.0);
    }

    #[test]
    fn destination_resolves_by_scope() {
        let mut nav = settings();
        assert!(nav.destination().is_none());
        nav.scope_mut(ScopeLevel::Subtask).destination = Some(Destination::Coordinate {
            point: Vector3::new(1.0, 2.0, 3.0),
        });
        assert!(matches!(nav.destination(), Destination::Coordinate { .. }));
        nav.on_subtask_complete();
        assert!(nav.destination().is_none());
    }

    #[test]
    fn incomplete_root_is_rejected() {
        let mut root = Scope::root(BlockId(1));
        root.speed_target = None;
        let err = NavSettings::with_root(root).unwrap_err();
        assert!(matches!(err, SettingsError::IncompleteRoot("speed_target")));
    }

    #[test]
    fn permission_bits() {
        let p = Permissions::ALL.without(Permissions::MOVE);
        assert!(p.contains(Permissions::ROTATE));
        assert!(!p.contains(Permissions::MOVE));
        assert!(p.with(Permissions::MOVE).contains(Permissions::ALL));
    }
}
