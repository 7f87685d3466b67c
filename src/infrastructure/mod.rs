// Infrastructure layer - External dependencies and adapters
pub mod backend_client;
pub mod config;
pub mod frame_stream;
pub mod http_response;
pub mod ws_transport;
