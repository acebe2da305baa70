// Copyright: Kyler Chin <kyler@catenarymaps.org>
// Catenary Transit Initiatives
// Removal of the attribution is not allowed, as covered under the AGPL license

#![deny(
    clippy::mutable_key_type,
    clippy::map_entry,
    clippy::boxed_local,
    clippy::let_unit_value,
    clippy::redundant_allocation,
    clippy::bool_comparison,
    clippy::bind_instead_of_map,
    clippy::vec_box,
    clippy::while_let_loop,
    clippy::useless_asref,
    clippy::repeat_once,
    clippy::deref_addrof,
    clippy::suspicious_map,
    clippy::arc_with_non_send_sync,
    clippy::single_char_pattern,
    clippy::for_kv_map,
    clippy::let_unit_value,
    clippy::let_and_return,
    clippy::iter_nth,
    clippy::iter_cloned_collect,
    clippy::bytes_nth,
    clippy::deprecated_clippy_cfg_attr,
    clippy::match_result_ok,
    clippy::cmp_owned,
    clippy::cmp_null,
    clippy::op_ref
)]

//! Desire path generation: given site zones and points of interest, find the
//! informal shortcuts pedestrians would wear into open ground.

pub mod clustering;
pub mod config;
pub mod errors;
pub mod geometry_utils;
pub mod graph;
pub mod models;
pub mod optimizer;
pub mod output;
pub mod pathfinding;
pub mod pipeline;
pub mod sampling;
pub mod zones;


pub use config::GenerationConfig;
pub use errors::DesirePathError;
pub use models::{OutputEdge, OutputPoint, PoiInput, ZoneInput, ZoneType};
pub use optimizer::CancelFlag;
pub use pipeline::{DesirePathOutput, GenerationReport, generate, generate_with_cancel, run_generation};
