//! Scenario replay progress

use serde::{Deserialize, Serialize};

use super::ScenarioDescription;

/// Cyclic playback position within a recorded scenario
///
/// Positions are 1-based; advancing past `count` wraps back to 1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayProgress {
    pub position: u32,
    pub count: u32,
}

impl ReplayProgress {
    pub fn new(count: u32, position: u32) -> Self {
        Self { position, count }
    }

    /// Step to the next frame, wrapping to the start of the scenario
    pub fn advance(&mut self) {
        self.position += 1;
        if self.position > self.count {
            self.position = 1;
        }
    }

    /// Rounded percentage of the scenario played so far
    pub fn percent(&self) -> u32 {
        if self.count == 0 {
            return 0;
        }
        ((self.position as f64 / self.count as f64) * 100.0).round() as u32
    }

    pub fn remaining_percent(&self) -> u32 {
        100u32.saturating_sub(self.percent())
    }
}

impl From<ScenarioDescription> for ReplayProgress {
    fn from(desc: ScenarioDescription) -> Self {
        Self::new(desc.count, desc.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_wraps_to_one() {
        let mut progress = ReplayProgress::new(10, 0);
        let positions: Vec<u32> = (0..11)
            .map(|_| {
                progress.advance();
                progress.position
            })
            .collect();
        assert_eq!(positions, vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 1]);
    }

    #[test]
    fn test_percentages() {
        let progress = ReplayProgress::new(3, 1);
        assert_eq!(progress.percent(), 33);
        assert_eq!(progress.remaining_percent(), 67);
        assert_eq!(ReplayProgress::new(8, 7).percent(), 88);
        assert_eq!(ReplayProgress::default().percent(), 0);
        assert_eq!(ReplayProgress::default().remaining_percent(), 100);
    }
}
