//! Progress reporting for commit construction

/// Caller-supplied progress sink, receiving a percentage from 0 to 100
pub type ProgressCallback<'a> = &'a (dyn Fn(u8) + Send + Sync);

/// The ordered stages of a commit
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum UploadStage {
    ResolveHead,
    FetchParent,
    BuildTree,
    CreateTree,
    CreateCommit,
    UpdateRef,
}

impl UploadStage {
    /// Completion percentage once the stage has finished
    pub fn percent(self) -> u8 {
        match self {
            UploadStage::ResolveHead => 10,
            UploadStage::FetchParent => 20,
            UploadStage::BuildTree => 40,
            UploadStage::CreateTree => 60,
            UploadStage::CreateCommit => 80,
            UploadStage::UpdateRef => 100,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            UploadStage::ResolveHead => "resolved branch head",
            UploadStage::FetchParent => "fetched parent commit",
            UploadStage::BuildTree => "prepared tree entries",
            UploadStage::CreateTree => "created tree",
            UploadStage::CreateCommit => "created commit",
            UploadStage::UpdateRef => "updated branch reference",
        }
    }
}

/// Forwards stage completions to an optional callback, never going backwards
pub struct ProgressReporter<'a> {
    callback: Option<ProgressCallback<'a>>,
    last: u8,
}

impl<'a> ProgressReporter<'a> {
    pub fn new(callback: Option<ProgressCallback<'a>>) -> Self {
        Self { callback, last: 0 }
    }

    pub fn complete(&mut self, stage: UploadStage) {
        let percent = stage.percent();
        if percent <= self.last {
            return;
        }
        self.last = percent;
        tracing::info!(percent, "{}", stage.description());
        if let Some(callback) = self.callback {
            callback(percent);
        }
    }

    pub fn last_reported(&self) -> u8 {
        self.last
    }
}
