pub mod config;
pub mod login;
pub mod routing;

// A helper backend is composed of 2 things:
// - A routing table, mapping the host part of an identity to a next hop (routing)
// - Something able to check a password (login)
