use std::cell::RefCell;

use indicatif::{ProgressBar, ProgressStyle};
use roiscope_core::progress::{ProgressReporter, Stage};

/// Terminal progress bar, one bar per stage.
pub struct BarReporter {
    style: ProgressStyle,
    bar: RefCell<Option<ProgressBar>>,
}

impl BarReporter {
    pub fn new() -> anyhow::Result<Self> {
        let style = ProgressStyle::default_bar()
            .template("{msg:22} [{bar:40}] {pos}/{len}")?
            .progress_chars("=> ");
        Ok(Self {
            style,
            bar: RefCell::new(None),
        })
    }
}

impl ProgressReporter for BarReporter {
    fn begin_stage(&self, stage: Stage, total_items: usize) {
        let pb = ProgressBar::new(total_items as u64);
        pb.set_style(self.style.clone());
        pb.set_message(stage.to_string());
        *self.bar.borrow_mut() = Some(pb);
    }

    fn advance(&self, items_done: usize) {
        if let Some(pb) = self.bar.borrow().as_ref() {
            pb.set_position(items_done as u64);
        }
    }

    fn finish_stage(&self) {
        if let Some(pb) = self.bar.borrow_mut().take() {
            pb.finish_and_clear();
        }
    }
}
