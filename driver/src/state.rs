//! Cap and light state

/// Software model of the servo. Nothing here is read back from hardware.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MoveState {
    /// Set between issuing a move and consuming its result
    pub is_moving: bool,
    /// The in-flight move is a direct angle step
    pub is_step_move: bool,
    /// Last commanded direction; persisted as the park status
    pub is_closing: bool,
    /// Last known servo position in degrees
    pub current_position: f64,
    /// Target of the in-flight move
    pub pending_target: Option<f64>,
}

impl MoveState {
    /// State right after connecting, seeded from the persisted park status
    pub fn seeded(parked: bool) -> Self {
        Self {
            is_closing: parked,
            ..Self::default()
        }
    }

    pub(crate) fn begin(&mut self, target: f64, step: bool) {
        self.is_moving = true;
        self.is_step_move = step;
        self.pending_target = Some(target);
    }

    /// Leave the moving state; the position only follows a successful move
    pub(crate) fn finish(&mut self, succeeded: bool) {
        if succeeded {
            if let Some(target) = self.pending_target {
                self.current_position = target;
            }
        }
        self.is_moving = false;
        self.is_step_move = false;
        self.pending_target = None;
    }
}

/// Cover state, in the cover-calibrator vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverState {
    /// Cover is closed/parked
    Closed,
    /// Cover is moving
    Moving,
    /// Cover is open/unparked
    Open,
    /// Not connected, or the last full move is not known
    Unknown,
}

impl CoverState {
    /// Convert to ASCOM-compatible integer value
    pub fn to_i32(&self) -> i32 {
        match self {
            CoverState::Closed => 1,
            CoverState::Moving => 2,
            CoverState::Open => 3,
            CoverState::Unknown => 4,
        }
    }
}

impl std::fmt::Display for CoverState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CoverState::Closed => write!(f, "Closed"),
            CoverState::Moving => write!(f, "Moving"),
            CoverState::Open => write!(f, "Open"),
            CoverState::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Flat light state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibratorState {
    /// No light source configured
    NotPresent,
    Off,
    /// Light is on
    Ready,
}

impl CalibratorState {
    /// Convert to ASCOM-compatible integer value
    pub fn to_i32(&self) -> i32 {
        match self {
            CalibratorState::NotPresent => 0,
            CalibratorState::Off => 1,
            CalibratorState::Ready => 3,
        }
    }
}

impl std::fmt::Display for CalibratorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CalibratorState::NotPresent => write!(f, "Not Present"),
            CalibratorState::Off => write!(f, "Off"),
            CalibratorState::Ready => write!(f, "Ready"),
        }
    }
}
