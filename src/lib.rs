#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![no_std]

pub use mq_core as queue;
pub use mq_os as os;
pub use mq_seq as seq;
pub use mq_verify as verify;
