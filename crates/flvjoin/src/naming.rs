use std::{
    ffi::OsStr,
    path::{Path, PathBuf},
};

/// Name used when the inputs share no usable prefix.
pub const DEFAULT_OUTPUT_NAME: &str = "joined.flv";

/// Appended to the common prefix of the inputs.
pub const JOINED_SUFFIX: &str = "-joined.flv";

/// Guess an output file name from the names of the fragments.
///
/// The lexicographically smallest and largest names are compared character
/// by character, and the prefix before the first difference becomes the
/// stem of the output. Recorders usually name fragments after a timestamp, so
/// `stream-001.flv` and `stream-002.flv` give `stream-00-joined.flv`.
///
/// Falls back to [DEFAULT_OUTPUT_NAME] when the names differ at the first
/// character, or when no difference exists within the shorter name.
pub fn derive_output_name<S>(names: &[S]) -> String
where
    S: AsRef<str>,
{
    let mut sorted: Vec<&str> = names.iter().map(AsRef::as_ref).collect();
    sorted.sort_unstable();

    let (Some(first), Some(last)) = (sorted.first(), sorted.last()) else {
        return DEFAULT_OUTPUT_NAME.to_string();
    };

    let mismatch = first
        .char_indices()
        .zip(last.chars())
        .find(|((_, a), b)| a != b)
        .map(|((index, _), _)| index);

    match mismatch {
        Some(index) if index > 0 => format!("{}{JOINED_SUFFIX}", &first[..index]),
        _ => DEFAULT_OUTPUT_NAME.to_string(),
    }
}

/// Same as [derive_output_name], but only looks at the final component of
/// each path, so the result always names a file in the working directory.
pub fn derive_output_path<P>(inputs: &[P]) -> PathBuf
where
    P: AsRef<Path>,
{
    let names: Vec<String> = inputs
        .iter()
        .map(|input| {
            input
                .as_ref()
                .file_name()
                .unwrap_or_else(|| input.as_ref().as_os_str())
                .to_string_lossy()
                .into_owned()
        })
        .collect();
    PathBuf::from(derive_output_name(&names))
}

/// Remove characters that would break a single-quoted concat manifest line.
pub fn sanitize_file_name(name: &OsStr) -> String {
    name.to_string_lossy()
        .chars()
        .filter(|c| !matches!(c, '\'' | '\n' | '\r'))
        .collect()
}
