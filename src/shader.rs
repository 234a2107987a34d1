//! Shader-variant preprocessing and compilation.
//!
//! WGSL has no preprocessor, so keyword variants work the same way the
//! GLSL lineage of this effect did: `#define KEYWORD` lines are textually
//! prepended and a minimal `#ifdef`/`#else`/`#endif` resolver strips the
//! inactive blocks before the source ever reaches the compiler. Variants
//! are cached by the canonical keyword *set*; two distinct sets can never
//! share a cache slot.

use std::collections::BTreeSet;

use crate::error::FluidError;

/// Canonical cache key for a keyword combination: an ordered set, so key
/// equality is exactly set equality regardless of the order keywords were
/// requested in.
pub fn keyword_set(keywords: &[&str]) -> BTreeSet<String> {
    keywords.iter().map(|k| k.to_string()).collect()
}

/// Prepends `#define` lines for every keyword, then resolves conditionals.
pub fn apply_keywords(source: &str, keywords: &BTreeSet<String>) -> String {
    let mut prefixed = String::new();
    for keyword in keywords {
        prefixed.push_str("#define ");
        prefixed.push_str(keyword);
        prefixed.push('\n');
    }
    prefixed.push_str(source);
    preprocess(&prefixed)
}

/// Resolves `#define`/`#ifdef`/`#else`/`#endif` lines, emitting only the
/// active blocks. Directives themselves never reach the output.
pub fn preprocess(source: &str) -> String {
    let mut defined: BTreeSet<&str> = BTreeSet::new();
    let mut stack: Vec<bool> = Vec::new();
    let mut out = String::with_capacity(source.len());

    for line in source.lines() {
        let trimmed = line.trim_start();
        let active = stack.iter().all(|&keep| keep);

        if let Some(rest) = trimmed.strip_prefix("#define ") {
            if active {
                defined.insert(rest.trim());
            }
        } else if let Some(rest) = trimmed.strip_prefix("#ifdef ") {
            stack.push(active && defined.contains(rest.trim()));
        } else if trimmed.starts_with("#else") {
            let parent = stack[..stack.len().saturating_sub(1)].iter().all(|&k| k);
            if let Some(top) = stack.last_mut() {
                *top = parent && !*top;
            }
        } else if trimmed.starts_with("#endif") {
            stack.pop();
        } else if active {
            out.push_str(line);
            out.push('\n');
        }
    }
    out
}

/// Compiles a WGSL module inside a validation error scope. A broken shader
/// is logged and reported as an error, never a panic; callers turn it into
/// a skipped pass.
pub fn compile_module(
    device: &wgpu::Device,
    label: &'static str,
    source: &str,
) -> Result<wgpu::ShaderModule, FluidError> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });
    if let Some(error) = pollster::block_on(device.pop_error_scope()) {
        let message = error.to_string();
        log::error!("shader '{label}' failed to compile: {message}");
        return Err(FluidError::ShaderCompile { label, message });
    }
    Ok(module)
}
