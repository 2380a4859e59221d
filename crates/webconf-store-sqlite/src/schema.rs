//! SQL schema for the webconf SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS plans (
    plan_id     TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    ops_type    TEXT NOT NULL,   -- payment gateway routing key, e.g. 'IUGU'
    identifier  TEXT NOT NULL    -- plan id on the payment gateway
);

-- One row per subscribed account. A row only exists once the gateway has
-- issued both a customer and a subscription token.
CREATE TABLE IF NOT EXISTS subscriptions (
    subscription_id         TEXT PRIMARY KEY,
    plan_id                 TEXT NOT NULL REFERENCES plans(plan_id),
    user_id                 TEXT NOT NULL,
    email                   TEXT NOT NULL,
    full_name               TEXT NOT NULL,
    meeting_id              TEXT NOT NULL,
    tax_id                  TEXT NOT NULL,
    address                 TEXT NOT NULL,
    additional_address_info TEXT,
    number                  TEXT NOT NULL,
    zip_code                TEXT NOT NULL,
    city                    TEXT NOT NULL,
    province                TEXT NOT NULL,
    district                TEXT NOT NULL,
    country                 TEXT NOT NULL,
    pay_day                 INTEGER NOT NULL,
    customer_token          TEXT,
    subscription_token      TEXT,
    status                  TEXT NOT NULL,   -- 'pending' | 'active' | 'terminated'
    created_at              TEXT NOT NULL,   -- ISO 8601 UTC
    updated_at              TEXT NOT NULL,
    UNIQUE (user_id)
);

CREATE INDEX IF NOT EXISTS subscriptions_plan_idx ON subscriptions(plan_id);

PRAGMA user_version = 1;
";
