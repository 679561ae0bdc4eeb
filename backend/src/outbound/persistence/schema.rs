//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match the database migrations exactly. The
//! `places` table is omitted because its PostGIS `geography` column is only
//! read through raw SQL in the proximity oracle.

diesel::table! {
    /// Offers users can accept from their inbox.
    offers (id) {
        id -> Uuid,
        place_id -> Nullable<Uuid>,
        title -> Varchar,
        end_at -> Timestamptz,
        /// Points credited on redemption; zero disables the ledger entry.
        reward_points -> Int8,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Per-user delivery of an offer.
    offer_inbox (user_id, offer_id) {
        user_id -> Uuid,
        offer_id -> Uuid,
        /// `new`, `accepted` or `dismissed`.
        status -> Varchar,
        delivered_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Vouchers issued by accepting offers; unique per `(user_id, offer_id)`.
    vouchers (id) {
        id -> Uuid,
        user_id -> Uuid,
        offer_id -> Uuid,
        /// `active`, `used` or `expired`.
        status -> Varchar,
        expire_at -> Timestamptz,
        used_at -> Nullable<Timestamptz>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Single-use QR tokens; only the SHA-256 hex digest of a code is kept.
    qr_tokens (id) {
        id -> Uuid,
        voucher_id -> Uuid,
        code_hash -> Varchar,
        ttl_sec -> Int4,
        /// `active`, `used` or `expired`.
        status -> Varchar,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Append-only points ledger.
    ledger_entries (id) {
        id -> Uuid,
        /// Append order within the table; tie-break for equal `created_at`.
        seq -> Int8,
        user_id -> Uuid,
        /// `earn`, `spend` or `reward`.
        entry_type -> Varchar,
        amount -> Int8,
        balance_after -> Int8,
        ref_id -> Nullable<Uuid>,
        description -> Nullable<Text>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Idempotency claims and completed response snapshots.
    ///
    /// A row with null `response_status` is an in-progress claim.
    idempotency_records (key) {
        key -> Uuid,
        user_id -> Uuid,
        scope -> Varchar,
        payload_hash -> Bytea,
        response_status -> Nullable<Int4>,
        response_body -> Nullable<Jsonb>,
        created_at -> Timestamptz,
        expires_at -> Timestamptz,
    }
}

diesel::joinable!(offer_inbox -> offers (offer_id));
diesel::joinable!(vouchers -> offers (offer_id));
diesel::joinable!(qr_tokens -> vouchers (voucher_id));

diesel::allow_tables_to_appear_in_same_query!(
    offers,
    offer_inbox,
    vouchers,
    qr_tokens,
    ledger_entries,
    idempotency_records,
);
