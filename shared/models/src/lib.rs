//! Shared data types for SkillSwap services.

pub mod auth;
