pub const SCHEMA: &str = r#"
-- Users are identified by email; password holds an opaque credential
CREATE TABLE IF NOT EXISTS users (
    email TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    password TEXT NOT NULL DEFAULT ''
);

-- Teams own apps, services and hooks; members is a JSON array of emails
CREATE TABLE IF NOT EXISTS teams (
    alias TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    owner TEXT NOT NULL,
    members TEXT NOT NULL DEFAULT '[]'
);

-- Team references are validated by callers, not by the store
CREATE TABLE IF NOT EXISTS apps (
    client_id TEXT PRIMARY KEY,
    client_secret TEXT NOT NULL,
    name TEXT NOT NULL,
    owner TEXT NOT NULL,
    team TEXT NOT NULL,
    redirect_uris TEXT NOT NULL DEFAULT '[]'
);

CREATE TABLE IF NOT EXISTS services (
    subdomain TEXT PRIMARY KEY,
    endpoint TEXT NOT NULL,
    team TEXT NOT NULL,
    owner TEXT NOT NULL,
    transformers TEXT NOT NULL DEFAULT '[]'
);

-- Plugins are unique per (name, service); removed explicitly before their service
CREATE TABLE IF NOT EXISTS plugins (
    name TEXT NOT NULL,
    service TEXT NOT NULL,
    config TEXT NOT NULL DEFAULT '{}',
    PRIMARY KEY (name, service)
);

-- Hooks are unique per (team, name); team '*' marks a global hook
CREATE TABLE IF NOT EXISTS hooks (
    team TEXT NOT NULL,
    name TEXT NOT NULL,
    events TEXT NOT NULL DEFAULT '[]',
    address TEXT NOT NULL,
    PRIMARY KEY (team, name)
);

-- Event index for hook resolution; the key collapses duplicate events
CREATE TABLE IF NOT EXISTS hook_events (
    team TEXT NOT NULL,
    name TEXT NOT NULL,
    event TEXT NOT NULL,
    PRIMARY KEY (team, name, event),
    FOREIGN KEY (team, name) REFERENCES hooks(team, name) ON DELETE CASCADE
);

-- Tokens carry a snapshot of the bound user, never its password
CREATE TABLE IF NOT EXISTS tokens (
    access_token TEXT PRIMARY KEY,
    expires INTEGER NOT NULL,
    token_type TEXT NOT NULL,
    user_email TEXT NOT NULL,
    user_name TEXT NOT NULL,
    client_id TEXT,
    created_at TEXT NOT NULL,
    expires_at INTEGER NOT NULL  -- unix milliseconds, for reaping
);

-- Create indexes
CREATE INDEX IF NOT EXISTS idx_teams_owner ON teams(owner);
CREATE INDEX IF NOT EXISTS idx_apps_team ON apps(team);
CREATE INDEX IF NOT EXISTS idx_services_team ON services(team);
CREATE INDEX IF NOT EXISTS idx_plugins_service ON plugins(service);
CREATE INDEX IF NOT EXISTS idx_hook_events_event ON hook_events(event);
CREATE INDEX IF NOT EXISTS idx_tokens_expires_at ON tokens(expires_at);
"#;
