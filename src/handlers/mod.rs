// handlers/mod.rs - Two-tier handler layout
//
// Public (no auth, /auth/*) → Protected (JWT auth + permission check, /api/*)
pub mod protected;
pub mod public;
