/// Route component constants shared across crates
pub const FILES_ROUTE_COMPONENT: &str = "files";
pub const UPLOAD_ROUTE_COMPONENT: &str = "upload";
pub const DELETE_ROUTE_COMPONENT: &str = "delete";
pub const MKDIR_ROUTE_COMPONENT: &str = "mkdir";
pub const SHARE_ROUTE_COMPONENT: &str = "share";
pub const SHARES_ROUTE_COMPONENT: &str = "shares";
pub const UNSHARE_ROUTE_COMPONENT: &str = "unshare";
pub const SHARED_ROUTE_COMPONENT: &str = "shared";
pub const SETUP_ROUTE_COMPONENT: &str = "setup";
pub const ADMIN_ROUTE_COMPONENT: &str = "admin";

pub const USER_ROUTE_COMPONENT: &str = "user";
pub const USER_ROUTE_PREFIX: &str = const_str::concat!("/", USER_ROUTE_COMPONENT);
pub const LOGIN_ROUTE: &str = const_str::concat!(USER_ROUTE_PREFIX, "/login");

pub const SHARED_ROUTE_PREFIX: &str = const_str::concat!("/", SHARED_ROUTE_COMPONENT);

/// Name of the cookie carrying the opaque session token.
pub const SESSION_COOKIE: &str = "strongbox_session";

/// Multipart field carrying uploaded files.
pub const UPLOAD_FIELD: &str = "files";

/// User-facing message for both missing and confined-away vault paths.
pub const MISSING_ENTRY_MESSAGE: &str = "Error: File or directory does not exist.";
