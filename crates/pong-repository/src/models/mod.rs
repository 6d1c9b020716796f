pub(crate) mod pong_responses;
