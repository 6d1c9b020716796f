mod runner;
mod shutdown;

use std::sync::Arc;

use pong_blockchain::EvmChain;

use crate::responder::Responder;

pub(crate) struct RuntimeDeps {
    pub(crate) chain: Arc<EvmChain>,
    pub(crate) responder: Responder,
    pub(crate) watch_poll_interval: std::time::Duration,
}

pub(crate) use runner::run;
