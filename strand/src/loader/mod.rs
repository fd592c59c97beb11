pub mod error;
mod lint;

pub use error::LoadError;

use serde::Deserialize;
use serde_json::Value as Json;
use serde_json::error::Category;
use serde_json::value::RawValue;

use crate::Program;
use crate::instruction::Instruction;
use crate::instruction::condition::Condition;

/// A decoded program together with any lint warnings raised against it.
#[derive(Debug, Clone)]
pub struct Loaded {
    pub program: Program,
    pub warnings: Vec<LoadError>,
}

/// Loader entry point: decodes the JSON encoding of a program.
pub struct Loader {
    source: String,
    file_id: usize,
}

impl Loader {
    pub fn new(source: String, file_id: usize) -> Self {
        Loader { source, file_id }
    }

    /// Decode the source into a Program and lint it.
    ///
    /// The top-level array is split first so that each instruction is decoded
    /// on its own: a bad instruction is labelled at its own element, and every
    /// bad element is reported rather than just the first.
    pub fn load(&self) -> Result<Loaded, Vec<LoadError>> {
        let elements: Vec<&RawValue> =
            serde_json::from_str(&self.source).map_err(|e| vec![self.source_error(&e)])?;

        let mut instructions = Vec::with_capacity(elements.len());
        let mut errors = Vec::new();
        for (index, raw) in elements.into_iter().enumerate() {
            match serde_json::from_str::<Instruction>(raw.get()) {
                Ok(instruction) => instructions.push(instruction),
                Err(e) => errors.push(self.element_error(index, raw, &e)),
            }
        }
        if !errors.is_empty() {
            return Err(errors);
        }

        let program = Program::new(instructions);
        let warnings = lint::lint_program(&program, self.file_id);
        Ok(Loaded { program, warnings })
    }

    /// An error in the outer array: serde_json's position is exact here.
    fn source_error(&self, error: &serde_json::Error) -> LoadError {
        let start = line_column_to_offset(&self.source, error.line(), error.column());
        let end = (start + 1).min(self.source.len());
        LoadError::error(describe(error), start..end, self.file_id).with_note(error.to_string())
    }

    /// An error inside one top-level instruction. Tagged enums are buffered
    /// before decoding, so serde_json's position is the end of the element;
    /// the element's own span is used instead and the failing node is found
    /// by walking the element's JSON tree.
    fn element_error(&self, index: usize, raw: &RawValue, error: &serde_json::Error) -> LoadError {
        let text = raw.get();
        let start = offset_within(&self.source, text);
        let span = start..start + text.len();
        let path = format!("[{}]", index);

        let located = match serde_json::from_str::<Json>(text) {
            Ok(tree) if !too_deep(error) => locate_instruction(&tree, &path),
            _ => None,
        };
        let (path, reason) = located.unwrap_or_else(|| (path, error.to_string()));
        LoadError::error(describe(error), span, self.file_id)
            .with_note(format!("at {}: {}", path, reason))
    }
}

fn describe(error: &serde_json::Error) -> &'static str {
    if too_deep(error) {
        return "program is nested too deeply";
    }
    match error.classify() {
        Category::Syntax => "malformed JSON",
        Category::Eof => "unexpected end of program",
        Category::Data => "invalid program",
        Category::Io => "cannot read program",
    }
}

/// serde_json reports its nesting limit as a syntax error; only the message tells them apart.
fn too_deep(error: &serde_json::Error) -> bool {
    error.to_string().starts_with("recursion limit exceeded")
}

/// Byte offset of `part` inside `source`; `part` must borrow from `source`.
fn offset_within(source: &str, part: &str) -> usize {
    (part.as_ptr() as usize)
        .saturating_sub(source.as_ptr() as usize)
        .min(source.len())
}

/// Deepest node under `node` that fails to decode as an instruction, with its
/// JSON path and the decode error.
fn locate_instruction(node: &Json, path: &str) -> Option<(String, String)> {
    let error = Instruction::deserialize(node).err()?;
    let deeper = node
        .get("condition")
        .and_then(|c| locate_condition(c, &format!("{}.condition", path)))
        .or_else(|| {
            ["then", "else", "body", "catch"].iter().find_map(|key| {
                node.get(key)
                    .and_then(|p| locate_program(p, &format!("{}.{}", path, key)))
            })
        });
    Some(deeper.unwrap_or_else(|| (path.to_string(), error.to_string())))
}

fn locate_condition(node: &Json, path: &str) -> Option<(String, String)> {
    let error = Condition::deserialize(node).err()?;
    let deeper = ["left", "right"]
        .iter()
        .find_map(|key| {
            node.get(key)
                .and_then(|o| locate_instruction(o, &format!("{}.{}", path, key)))
        })
        .or_else(|| {
            node.get("condition")
                .and_then(|c| locate_condition(c, &format!("{}.condition", path)))
        });
    Some(deeper.unwrap_or_else(|| (path.to_string(), error.to_string())))
}

fn locate_program(node: &Json, path: &str) -> Option<(String, String)> {
    node.as_array()?
        .iter()
        .enumerate()
        .find_map(|(i, item)| locate_instruction(item, &format!("{}[{}]", path, i)))
}

/// Convert serde_json's 1-based line and column into a byte offset in `source`.
fn line_column_to_offset(source: &str, line: usize, column: usize) -> usize {
    if line == 0 {
        return 0;
    }
    let line_start: usize = source
        .split_inclusive('\n')
        .take(line - 1)
        .map(str::len)
        .sum();
    (line_start + column.saturating_sub(1)).min(source.len())
}
