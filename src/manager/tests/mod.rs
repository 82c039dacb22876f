use super::test_helpers::*;
use super::*;
use crate::error::{BoxError, Error};
use crate::types::{
    CANCELLED_BY_CALLER, CANCELLED_BY_SHUTDOWN, Metadata, Params, TASK_ID_KEY, TaskStatus,
};
use crate::work::WorkFn;
use serde_json::json;
use std::result::Result;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
