//! Progress reporting with indicatif

use indicatif::{ProgressBar, ProgressStyle};
use pic24prog_core::flash::Progress;

/// Create a progress bar labelled with the memory region
fn create_progress_bar(total: u64, phase: &str) -> Result<ProgressBar, Box<dyn std::error::Error>> {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(&format!(
                "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} words ({{eta}}) {}",
                phase
            ))?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

/// Progress reporter using indicatif progress bars
pub struct IndicatifProgress {
    current_bar: Option<ProgressBar>,
}

impl IndicatifProgress {
    pub fn new() -> Self {
        Self { current_bar: None }
    }

    fn start(&mut self, total: usize, phase: String) {
        self.finish();
        let pb = create_progress_bar(total as u64, &phase)
            .unwrap_or_else(|_| ProgressBar::new(total as u64));
        self.current_bar = Some(pb);
    }

    fn set_position(&self, pos: usize) {
        if let Some(pb) = &self.current_bar {
            pb.set_position(pos as u64);
        }
    }

    fn finish(&mut self) {
        if let Some(pb) = self.current_bar.take() {
            pb.finish();
        }
    }
}

impl Default for IndicatifProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl Progress for IndicatifProgress {
    fn reading(&mut self, region: &str, total_words: usize) {
        self.start(total_words, format!("Reading {}", region));
    }

    fn read_progress(&mut self, words_read: usize) {
        self.set_position(words_read);
    }

    fn writing(&mut self, region: &str, total_words: usize) {
        self.start(total_words, format!("Writing {}", region));
    }

    fn write_progress(&mut self, words_written: usize) {
        self.set_position(words_written);
    }

    fn complete(&mut self) {
        self.finish();
    }
}
