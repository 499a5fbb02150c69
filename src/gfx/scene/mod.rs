//! # Scene Management Module
//!
//! This module holds the in-memory representation of a loaded model and the
//! world it is shown in.
//!
//! ## Key Components
//!
//! - [`Scene`] - Baseline lights, the attached model and its pickable nodes
//! - [`SceneGraph`] - Node hierarchy with mesh and material arenas
//! - [`Mesh`] - Triangle geometry with an optional per-vertex color attribute
//! - [`Material`] - Closed set of material kinds plus texture channels
//!
//! ## Ownership
//!
//! The viewer owns one [`Scene`]. Loading a new archive builds a fresh
//! [`SceneGraph`] off to the side and only then swaps it in with
//! [`Scene::attach`], so a failed load never disturbs what is on screen.

pub mod graph;
pub mod material;
pub mod mesh;
pub mod scene;

// Re-export main types
pub use graph::{MeshId, Node, NodeId, SceneGraph, SceneStatistics, Transform};
pub use material::{Material, MaterialId, MaterialKind, MaterialLibrary, Side, TextureChannels};
pub use mesh::{ColorAttribute, Mesh};
pub use scene::{Light, Scene};
