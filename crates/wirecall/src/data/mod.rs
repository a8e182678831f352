// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Wire values: [`Value`] and [`DynamicStruct`].

mod dynamic_struct;
mod value;

pub use dynamic_struct::DynamicStruct;
pub use value::{EnumValue, FromValue, IntoValue, LocalValue, Value};
