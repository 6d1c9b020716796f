mod blockchain;
mod responder;

pub use blockchain::*;
pub use responder::*;
