//! Channel catalog
//!
//! Names and argument shapes agreed between the components that publish and
//! subscribe. The bus never checks them; any string works as a channel.

// ============================================================================
// Application lifecycle
// ============================================================================

/// All components are loaded. No arguments.
pub const APP_STARTED: &str = "app/started";
/// The process is shutting down. No arguments.
pub const APP_EXIT: &str = "app/exit";

// ============================================================================
// System
// ============================================================================

/// System settings changed. `(changes: object)`
pub const SYSTEM_SETTING: &str = "system/setting";
/// Monitoring data refreshed. `(kind: "server" | "judge", values: object)`
pub const MONITOR_UPDATE: &str = "monitor/update";

// ============================================================================
// Users and sessions
// ============================================================================

/// A user session was created. `(uid: number, session_id: string)`
pub const SESSION_CREATED: &str = "session/created";
/// A user document was loaded; subscribers may decorate it. `(user: object)`
pub const USER_GET: &str = "user/get";
/// A user received a message. `(uid: number, message: object)`
pub const USER_MESSAGE: &str = "user/message";
/// Drop cached user entries. `(key: string)`, usually sent with `broadcast`
pub const USER_DELCACHE: &str = "user/delcache";

// ============================================================================
// Content items
// ============================================================================

/// Runs before an item is created; a failure vetoes it. `(domain_id: string, item: object)`
pub const ITEM_BEFORE_CREATE: &str = "item/before-create";
/// A content item was created. `(item_id: number)`
pub const ITEM_CREATED: &str = "item/created";
/// An item is about to be deleted; a failure vetoes it. `(domain_id: string, item_id: number)`
pub const ITEM_BEFORE_DELETE: &str = "item/before-delete";
/// A content item was deleted. `(domain_id: string, item_id: number)`
pub const ITEM_DELETED: &str = "item/deleted";
/// First subscriber returning a value decides the item's visibility. `(item: object, viewer: number)`
pub const ITEM_VISIBILITY: &str = "item/visibility";

// ============================================================================
// Records
// ============================================================================

/// A record changed. `(record: object, set?: object, push?: object)`
pub const RECORD_CHANGE: &str = "record/change";
/// A record finished judging. `(record: object, updated: bool)`
pub const RECORD_JUDGE: &str = "record/judge";

// ============================================================================
// Cache
// ============================================================================

/// Invalidate a cache key in every process. `(key: string)`
pub const CACHE_INVALIDATE: &str = "cache/invalidate";
