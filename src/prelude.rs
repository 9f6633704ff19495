// SPDX-License-Identifier: MPL-2.0

//! The crate-internal prelude.

#![allow(unused_imports)]

pub(crate) use alloc::{
    boxed::Box,
    collections::BTreeMap,
    sync::{Arc, Weak},
    vec,
    vec::Vec,
};
pub(crate) use core::ops::Range;

pub(crate) use bitflags::bitflags;
pub(crate) use log::{debug, trace, warn};
pub(crate) use spin::{Mutex, MutexGuard, Once, RwLock};

pub(crate) use crate::{
    error::{Errno, Error, Result},
    return_errno, return_errno_with_message,
    vm::{Vaddr, PAGE_SIZE},
};
