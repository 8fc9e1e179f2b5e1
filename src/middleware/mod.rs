/*
 * Responsibility
 * - Router-level layers (transport, CORS, response headers, debug request log)
 * - Each module exposes `apply(router, ..) -> Router`
 */
pub mod cors;
pub mod http;
pub mod request_log;
pub mod security_headers;
