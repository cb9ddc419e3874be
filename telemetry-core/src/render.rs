//! Render target port
//!
//! The poller knows nothing about how readings are shown. Anything that wants
//! the published views registers a render target and gets `update` called
//! after every successful cycle.

use crate::history::Publication;
use crate::types::Result;

/// A consumer of published views (gauge, trend chart, table, ...)
pub trait RenderTarget: Send {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Redraw from the latest publication
    fn update(&mut self, publication: &Publication) -> Result<()>;
}

/// Update every target, logging failures instead of propagating them
///
/// Returns the number of targets that updated successfully.
pub fn update_all(targets: &mut [Box<dyn RenderTarget>], publication: &Publication) -> usize {
    let mut updated = 0;
    for target in targets.iter_mut() {
        match target.update(publication) {
            Ok(()) => updated += 1,
            Err(e) => log::warn!("Render target '{}' failed: {}", target.name(), e),
        }
    }
    updated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::RecordHistory;
    use crate::types::TelemetryError;
    use chrono::Local;

    struct Counting(usize);

    impl RenderTarget for Counting {
        fn name(&self) -> &str {
            "counting"
        }

        fn update(&mut self, _publication: &Publication) -> Result<()> {
            self.0 += 1;
            Ok(())
        }
    }

    struct Broken;

    impl RenderTarget for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn update(&mut self, _publication: &Publication) -> Result<()> {
            Err(TelemetryError::Render {
                target: "broken".to_string(),
                message: "canvas gone".to_string(),
            })
        }
    }

    #[test]
    fn test_failing_target_does_not_block_others() {
        let publication = Publication::from_history(&RecordHistory::default(), 50, 10, Local::now());
        let mut targets: Vec<Box<dyn RenderTarget>> =
            vec![Box::new(Broken), Box::new(Counting(0)), Box::new(Counting(0))];

        assert_eq!(update_all(&mut targets, &publication), 2);
    }
}
