/// Cross-cutting notifications raised by the response interceptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// A response came back 401. The session is already cleared; the front
    /// end should navigate to its login view.
    SessionExpired,
    /// A response came back 403, i.e. the user touched a resource that is not
    /// theirs. The session stays valid.
    AccessForbidden { detail: Option<String> },
}
