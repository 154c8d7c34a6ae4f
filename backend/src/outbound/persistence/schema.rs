//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match `backend/migrations` exactly. The
//! `diesel print-schema` command can regenerate them from a live database.

diesel::table! {
    /// Per-user expense categories.
    ///
    /// Names are unique per user ignoring case, enforced by the
    /// `categories_user_lower_name_key` index on `(user_id, lower(name))`.
    categories (id) {
        /// Primary key assigned by the database.
        id -> Int8,
        /// Owning user (external identity provider subject).
        user_id -> Uuid,
        /// Display name as first submitted (max 255 characters).
        name -> Varchar,
        /// Record creation timestamp.
        created_at -> Timestamptz,
        /// Last modification timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Expenses recorded by users, soft-deleted via `deleted_at`.
    expenses (id) {
        /// Primary key assigned by the database.
        id -> Int8,
        /// Owning user.
        user_id -> Uuid,
        /// Client-generated identifier supplied at creation.
        local_id -> Nullable<Varchar>,
        /// Product description (max 255 characters).
        product -> Varchar,
        /// Amount as `NUMERIC(12, 2)`.
        price -> Numeric,
        /// Optional category; cleared if the category row is removed.
        category_id -> Nullable<Int8>,
        /// When the expense happened, as reported by the client.
        spent_at -> Timestamptz,
        /// Record creation timestamp.
        created_at -> Timestamptz,
        /// Last modification timestamp, the last-writer-wins reference.
        updated_at -> Timestamptz,
        /// Soft-deletion marker.
        deleted_at -> Nullable<Timestamptz>,
    }
}

diesel::joinable!(expenses -> categories (category_id));
diesel::allow_tables_to_appear_in_same_query!(categories, expenses);
