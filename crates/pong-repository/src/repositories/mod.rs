pub(crate) mod pong_response_repository;
