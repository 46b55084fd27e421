#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure navigation system translating player intents into movement commands.

use geocoin_core::{Command, Direction, LatLng};

/// Intent captured by an adapter during a single update.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NavigationInput {
    /// A directional button was pressed.
    Step(Direction),
    /// The reset button was pressed.
    Reset,
    /// The location sensor button was pressed.
    ToggleSensor,
    /// The location provider reported a new position.
    PositionFix(LatLng),
}

/// Pure system that emits movement commands followed by a survey.
#[derive(Debug, Default)]
pub struct Navigation {
    tracking: bool,
}

impl Navigation {
    /// Creates a navigation system with location tracking disabled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a navigation system with location tracking already enabled.
    #[must_use]
    pub const fn tracking() -> Self {
        Self { tracking: true }
    }

    /// Reports whether position fixes currently move the player.
    #[must_use]
    pub const fn is_tracking(&self) -> bool {
        self.tracking
    }

    /// Consumes adapter inputs and emits the resulting world commands.
    ///
    /// Fixes received while tracking is off are dropped. A single
    /// [`Command::Survey`] follows the batch whenever the player moved.
    pub fn handle(&mut self, inputs: &[NavigationInput], out: &mut Vec<Command>) {
        let mut moved = false;

        for input in inputs {
            match *input {
                NavigationInput::Step(direction) => {
                    out.push(Command::StepPlayer { direction });
                    moved = true;
                }
                NavigationInput::Reset => {
                    out.push(Command::ResetPlayer);
                    moved = true;
                }
                NavigationInput::ToggleSensor => self.tracking = !self.tracking,
                NavigationInput::PositionFix(to) => {
                    if self.tracking {
                        out.push(Command::MovePlayer { to });
                        moved = true;
                    }
                }
            }
        }

        if moved {
            out.push(Command::Survey);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sensor_toggle_flips_tracking() {
        let mut navigation = Navigation::new();
        let mut commands = Vec::new();

        navigation.handle(&[NavigationInput::ToggleSensor], &mut commands);
        assert!(navigation.is_tracking());
        navigation.handle(&[NavigationInput::ToggleSensor], &mut commands);
        assert!(!navigation.is_tracking());
        assert!(commands.is_empty());
    }

    #[test]
    fn tracking_constructor_accepts_fixes_immediately() {
        let mut navigation = Navigation::tracking();
        let mut commands = Vec::new();
        let to = LatLng::new(1.0, 2.0);

        navigation.handle(&[NavigationInput::PositionFix(to)], &mut commands);
        assert_eq!(commands, vec![Command::MovePlayer { to }, Command::Survey]);
    }
}
