/*!
 * Request extractors
 *
 * - SessionScope: the inbound cookies, handed to the identity provider
 * - Authorized: a resolved credential, or the request is rejected (500 when the
 *   upstream is not configured, 401 when no credential resolves)
 */

mod authorized;
mod session;

pub use authorized::Authorized;
