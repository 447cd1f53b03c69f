use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoupleError>;

#[derive(Error, Debug)]
pub enum CoupleError {
    #[error("Git error: {0}")]
    Git(#[from] Box<gix::open::Error>),
    #[error("Git repository error: {0}")]
    GitRepo(String),
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("Cache error: {0}")]
    Cache(String),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Invalid date: {0}")]
    InvalidDate(String),
    #[error("Window length must be a positive number of days, got {0}")]
    InvalidWindowLength(i64),
    #[error("Event from repository {found} passed in the stream of repository {expected}")]
    MixedRepoStream { expected: usize, found: usize },
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
    #[error("Object find error: {0}")]
    ObjectFind(#[from] Box<gix::object::find::existing::Error>),
    #[error("Commit error: {0}")]
    Commit(#[from] Box<gix::object::commit::Error>),
    #[error("Reference find error: {0}")]
    RefFind(#[from] Box<gix::reference::find::existing::Error>),
    #[error("Head peel error: {0}")]
    HeadPeel(#[from] Box<gix::head::peel::to_commit::Error>),
    #[error("Object find with conversion error: {0}")]
    ObjectFindConv(#[from] Box<gix::object::find::existing::with_conversion::Error>),
    #[error("Object decode error: {0}")]
    ObjectDecode(#[from] Box<gix::objs::decode::Error>),
    #[error("Diff tree to tree error: {0}")]
    DiffTreeToTree(#[from] Box<gix::repository::diff_tree_to_tree::Error>),
    #[error("Git discover error: {0}")]
    GitDiscover(#[from] Box<gix::discover::Error>),
}

// gix errors are large; keep them boxed inside the enum
impl From<gix::open::Error> for CoupleError {
    fn from(err: gix::open::Error) -> Self {
        CoupleError::Git(Box::new(err))
    }
}

impl From<gix::object::find::existing::Error> for CoupleError {
    fn from(err: gix::object::find::existing::Error) -> Self {
        CoupleError::ObjectFind(Box::new(err))
    }
}

impl From<gix::object::commit::Error> for CoupleError {
    fn from(err: gix::object::commit::Error) -> Self {
        CoupleError::Commit(Box::new(err))
    }
}

impl From<gix::reference::find::existing::Error> for CoupleError {
    fn from(err: gix::reference::find::existing::Error) -> Self {
        CoupleError::RefFind(Box::new(err))
    }
}

impl From<gix::head::peel::to_commit::Error> for CoupleError {
    fn from(err: gix::head::peel::to_commit::Error) -> Self {
        CoupleError::HeadPeel(Box::new(err))
    }
}

impl From<gix::object::find::existing::with_conversion::Error> for CoupleError {
    fn from(err: gix::object::find::existing::with_conversion::Error) -> Self {
        CoupleError::ObjectFindConv(Box::new(err))
    }
}

impl From<gix::objs::decode::Error> for CoupleError {
    fn from(err: gix::objs::decode::Error) -> Self {
        CoupleError::ObjectDecode(Box::new(err))
    }
}

impl From<gix::repository::diff_tree_to_tree::Error> for CoupleError {
    fn from(err: gix::repository::diff_tree_to_tree::Error) -> Self {
        CoupleError::DiffTreeToTree(Box::new(err))
    }
}

impl From<gix::discover::Error> for CoupleError {
    fn from(err: gix::discover::Error) -> Self {
        CoupleError::GitDiscover(Box::new(err))
    }
}
