use indicatif::{ProgressBar, ProgressStyle};

/// A spinner ticking on its own thread while the caller keeps working.
pub struct Spinner {
    progress: ProgressBar
}
impl Spinner {
    pub fn spawn<S>(message: S) -> Self
        where
            S: AsRef<str>
    {
        let style = ProgressStyle::default_spinner()
            .template("{spinner}  {wide_msg}");
        let progress = ProgressBar::new_spinner();
        progress.set_style(style);
        progress.set_message(message.as_ref());
        progress.enable_steady_tick(50);

        Spinner { progress }
    }

    pub fn finish(self) {
        self.progress.finish_and_clear();
    }
}
