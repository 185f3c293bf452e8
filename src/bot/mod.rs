mod dispatcher;

pub use dispatcher::{Dispatcher, FatalError};
