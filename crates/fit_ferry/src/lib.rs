//! fit-ferry - move workout files between Sports Tracker and Endomondo.
//!
//! `download` pulls every recorded workout from the Sports Tracker API as a
//! FIT file; `upload` drives a browser through Endomondo's file-import flow
//! for every local FIT file.

pub mod browser;
pub mod cli;
pub mod download;
pub mod upload;
