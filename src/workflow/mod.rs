pub mod consumer;
pub mod dispatcher;
pub mod orchestrator;

pub use consumer::JobConsumer;
pub use dispatcher::{LocalDispatcher, RemoteDispatcher, SegmentDispatcher, SegmentReply};
pub use orchestrator::{JobReport, Orchestrator};
