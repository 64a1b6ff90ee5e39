#![allow(dead_code)]

pub mod identities;
