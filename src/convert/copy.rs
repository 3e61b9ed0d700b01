//! Element and channel copy strategies, composed into a `CopyPlan`.

use super::{ConvertFn, conversion};
use crate::model::{Schema, Value};
use crate::{Error, Result};

/// Which part of the value a link reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementCopy {
    /// Whole value to whole value; arrays element-wise over the common prefix.
    Whole,
    /// One source element to the whole destination.
    FromElement(usize),
    /// Whole source into one destination element.
    ToElement(usize),
    /// One element to one element.
    Element { source: usize, destination: usize },
}

impl ElementCopy {
    pub fn new(source_index: Option<usize>, destination_index: Option<usize>) -> Self {
        match (source_index, destination_index) {
            (None, None) => ElementCopy::Whole,
            (Some(s), None) => ElementCopy::FromElement(s),
            (None, Some(d)) => ElementCopy::ToElement(d),
            (Some(source), Some(destination)) => ElementCopy::Element { source, destination },
        }
    }

    /// Copy `input` (or one of its elements) into `output` (or one of its elements).
    pub fn copy(self, convert: ConvertFn, input: &Value, output: &mut Value) {
        match self {
            ElementCopy::Whole => {
                if let (Value::Array(src), Value::Array(dst)) = (input, &mut *output) {
                    for (s, d) in src.iter().zip(dst.iter_mut()) {
                        *d = convert(s, d);
                    }
                    return;
                }
                *output = convert(input, output);
            }
            ElementCopy::FromElement(i) => {
                if let Some(s) = input.element(i) {
                    *output = convert(s, output);
                }
            }
            ElementCopy::ToElement(j) => {
                if let Some(d) = output.element_mut(j) {
                    *d = convert(input, d);
                }
            }
            ElementCopy::Element { source, destination } => {
                if let (Some(s), Some(d)) = (input.element(source), output.element_mut(destination)) {
                    *d = convert(s, d);
                }
            }
        }
    }
}

/// How channels of multi properties map onto each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelCopy {
    /// Neither side is multi.
    Single,
    /// Single source into every destination channel.
    Broadcast,
    /// Channel for channel; the destination takes the source channel count.
    PerChannel,
    /// First source channel into a single destination.
    FirstChannel,
}

impl ChannelCopy {
    pub fn new(source_multi: bool, destination_multi: bool) -> Self {
        match (source_multi, destination_multi) {
            (false, false) => ChannelCopy::Single,
            (false, true) => ChannelCopy::Broadcast,
            (true, true) => ChannelCopy::PerChannel,
            (true, false) => ChannelCopy::FirstChannel,
        }
    }
}

/// Precomputed strategy for one link: conversion + element copy + channel copy.
#[derive(Debug, Clone, Copy)]
pub struct CopyPlan {
    convert: ConvertFn,
    element: ElementCopy,
    channels: ChannelCopy,
}

impl CopyPlan {
    pub fn new(convert: ConvertFn, element: ElementCopy, channels: ChannelCopy) -> Self {
        Self { convert, element, channels }
    }

    /// Resolve the plan for a link between two schemas.
    pub fn for_endpoints(
        source: &Schema,
        destination: &Schema,
        source_index: Option<usize>,
        destination_index: Option<usize>,
    ) -> Result<Self> {
        check_index("source", source, source_index)?;
        check_index("destination", destination, destination_index)?;

        let convert = conversion(source.kind, destination.kind).ok_or_else(|| {
            Error::LinkError(format!("no conversion from {} to {}", source.kind, destination.kind))
        })?;

        Ok(Self::new(
            convert,
            ElementCopy::new(source_index, destination_index),
            ChannelCopy::new(source.multi, destination.multi),
        ))
    }

    pub fn element(&self) -> ElementCopy { self.element }
    pub fn channels(&self) -> ChannelCopy { self.channels }

    /// Push `input` into `output`. `preset` seeds channels added to a
    /// multi destination.
    pub fn apply(&self, input: &Value, output: &mut Value, preset: &Value) {
        let (convert, element) = (self.convert, self.element);
        match self.channels {
            ChannelCopy::Single => element.copy(convert, input, output),
            ChannelCopy::Broadcast => {
                if let Value::Multi(channels) = output {
                    for channel in channels.iter_mut() {
                        element.copy(convert, input, channel);
                    }
                }
            }
            ChannelCopy::PerChannel => {
                if let (Value::Multi(src), Value::Multi(dst)) = (input, &mut *output) {
                    dst.resize(src.len(), preset.clone());
                    for (s, d) in src.iter().zip(dst.iter_mut()) {
                        element.copy(convert, s, d);
                    }
                }
            }
            ChannelCopy::FirstChannel => {
                if let Value::Multi(src) = input {
                    if let Some(first) = src.first() {
                        element.copy(convert, first, output);
                    }
                }
            }
        }
    }
}

fn check_index(end: &str, schema: &Schema, index: Option<usize>) -> Result<()> {
    let Some(index) = index else {
        return Ok(());
    };
    let count = schema.element_count();
    if count == 1 {
        return Err(Error::LinkError(format!("{end} has a single element and cannot be indexed")));
    }
    if index >= count {
        return Err(Error::LinkError(format!("{end} index {index} out of range for {count} elements")));
    }
    Ok(())
}
