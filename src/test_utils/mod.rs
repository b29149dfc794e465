/// In-memory connector for pool tests and the simulator
pub mod mock;

pub use mock::{MockConnector, MockReply};
