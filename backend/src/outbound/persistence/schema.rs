//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match `backend/migrations` exactly. Regenerate with
//! `diesel print-schema` after changing a migration.

diesel::table! {
    /// Registered canaries, one row per (domain, owner).
    canaries (id) {
        id -> Uuid,
        user_id -> Uuid,
        domain -> Varchar,
        name -> Varchar,
        about -> Text,
        verification_completed -> Bool,
        verification_code -> Varchar,
        logo -> Nullable<Text>,
        created -> Timestamptz,
    }
}

diesel::table! {
    /// SHA-256 fingerprints of deleted canary domains.
    deleted_canaries (domain_hash) {
        domain_hash -> Text,
        deleted_at -> Timestamptz,
    }
}

diesel::table! {
    /// Warrants of every lifecycle state. Drafts have `published = false`.
    canary_warrants (id) {
        id -> Uuid,
        canary_id -> Uuid,
        user_id -> Uuid,
        issued -> Timestamptz,
        next_canary -> Timestamptz,
        /// JSON array of attached documents, in attachment order.
        documents -> Jsonb,
        published -> Bool,
        active -> Bool,
        concern -> Nullable<Varchar>,
        statement -> Nullable<Text>,
        signature -> Nullable<Varchar>,
        overdue_notified -> Bool,
    }
}

diesel::table! {
    /// (subscriber, canary) pairs.
    canary_subscriptions (user_id, canary_id) {
        user_id -> Uuid,
        canary_id -> Uuid,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// User-pinned trust anchors keyed by (user, domain).
    trusted_canaries (user_id, domain) {
        user_id -> Uuid,
        domain -> Varchar,
        public_key_hash -> Varchar,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Per-user delivery preferences.
    notification_preferences (user_id) {
        user_id -> Uuid,
        email -> Nullable<Text>,
        email_categories -> Jsonb,
        webhooks -> Jsonb,
        push -> Jsonb,
        updated_at -> Timestamptz,
    }
}

diesel::joinable!(canary_warrants -> canaries (canary_id));
diesel::joinable!(canary_subscriptions -> canaries (canary_id));

diesel::allow_tables_to_appear_in_same_query!(
    canaries,
    canary_subscriptions,
    canary_warrants,
    deleted_canaries,
    notification_preferences,
    trusted_canaries,
);
