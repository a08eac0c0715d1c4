pub mod finite_mdp;

pub use finite_mdp::{FiniteMdp, MdpTable};
