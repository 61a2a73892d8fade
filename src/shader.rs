//! Shader programs built from WGSL stage files.
//!
//! A program is a list of [`ShaderStageInfo`] entries, each naming a WGSL file
//! and the stage it provides. Sources come from a [`ShaderLibrary`]: the
//! built-in shaders shipped with the crate, optionally overridden by files in
//! an asset directory. Before compilation every source goes through a small
//! preprocessor that expands `#include "file"` lines.
//!
//! Compiled programs keep a reflected map from resource names to their
//! `@group`/`@binding` slots, so bind groups are built by name instead of
//! hard-coded indices.

use std::{
    collections::{HashMap, HashSet},
    path::{Path, PathBuf},
};

use wgpu::util::DeviceExt;

#[derive(Debug, thiserror::Error)]
pub enum ShaderError {
    #[error("shader source `{0}` not found")]
    MissingSource(String),
    #[error("include cycle: {0}")]
    IncludeCycle(String),
    #[error("malformed include in `{file}`: `{line}`")]
    MalformedInclude { file: String, line: String },
    #[error("unsupported shader stage `{0}`")]
    UnsupportedStage(String),
    #[error("failed to compile `{path}` for program `{program}`:\n{message}")]
    Compile {
        program: String,
        path: String,
        message: String,
    },
    #[error("`{path}` has no `{entry_point}` entry point for the {stage:?} stage")]
    MissingEntryPoint {
        path: String,
        stage: ShaderStage,
        entry_point: &'static str,
    },
    #[error("binding `{name}` is declared at {first:?} and at {second:?}")]
    BindingConflict {
        name: String,
        first: BindingSlot,
        second: BindingSlot,
    },
    #[error("program `{program}` has no binding `{name}` in group {group}")]
    UnknownBinding {
        program: String,
        name: String,
        group: u32,
    },
    #[error("program `{program}` has no {stage:?} stage")]
    MissingStage { program: String, stage: ShaderStage },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Compute,
}

impl ShaderStage {
    pub fn entry_point(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vs_main",
            ShaderStage::Fragment => "fs_main",
            ShaderStage::Compute => "cs_main",
        }
    }

    fn naga_stage(self) -> naga::ShaderStage {
        match self {
            ShaderStage::Vertex => naga::ShaderStage::Vertex,
            ShaderStage::Fragment => naga::ShaderStage::Fragment,
            ShaderStage::Compute => naga::ShaderStage::Compute,
        }
    }
}

impl std::str::FromStr for ShaderStage {
    type Err = ShaderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "vertex" => Ok(ShaderStage::Vertex),
            "fragment" => Ok(ShaderStage::Fragment),
            "compute" => Ok(ShaderStage::Compute),
            other => Err(ShaderError::UnsupportedStage(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderStageInfo {
    pub path: String,
    pub stage: ShaderStage,
}

impl ShaderStageInfo {
    pub fn new(path: &str, stage: ShaderStage) -> Self {
        Self {
            path: path.to_string(),
            stage,
        }
    }

    /// Vertex and fragment stages read from one file.
    pub fn render(path: &str) -> Vec<Self> {
        vec![
            Self::new(path, ShaderStage::Vertex),
            Self::new(path, ShaderStage::Fragment),
        ]
    }
}

const BUILTIN_SHADERS: &[(&str, &str)] = &[
    ("common.wgsl", include_str!("shaders/common.wgsl")),
    ("sampling.wgsl", include_str!("shaders/sampling.wgsl")),
    ("cubemap.wgsl", include_str!("shaders/cubemap.wgsl")),
    (
        "equirect_to_cubemap.wgsl",
        include_str!("shaders/equirect_to_cubemap.wgsl"),
    ),
    ("mipmap.wgsl", include_str!("shaders/mipmap.wgsl")),
    (
        "irradiance_convolution.wgsl",
        include_str!("shaders/irradiance_convolution.wgsl"),
    ),
    ("prefilter.wgsl", include_str!("shaders/prefilter.wgsl")),
    ("brdf.wgsl", include_str!("shaders/brdf.wgsl")),
    ("background.wgsl", include_str!("shaders/background.wgsl")),
    ("pbr.wgsl", include_str!("shaders/pbr.wgsl")),
    ("light.wgsl", include_str!("shaders/light.wgsl")),
];

/// Where shader sources are looked up.
///
/// Lookup order: sources inserted with [`insert`](Self::insert), then files
/// below the root directory, then the built-in shaders.
#[derive(Debug, Clone, Default)]
pub struct ShaderLibrary {
    root: Option<PathBuf>,
    sources: HashMap<String, String>,
}

impl ShaderLibrary {
    /// Only the built-in shaders.
    pub fn builtin() -> Self {
        Self::default()
    }

    /// Files in `dir` take precedence over the built-in shaders.
    pub fn with_root(dir: impl AsRef<Path>) -> Self {
        Self {
            root: Some(dir.as_ref().to_path_buf()),
            sources: HashMap::new(),
        }
    }

    pub fn insert(&mut self, name: &str, source: &str) {
        self.sources.insert(name.to_string(), source.to_string());
    }

    pub fn builtin_names() -> impl Iterator<Item = &'static str> {
        BUILTIN_SHADERS.iter().map(|(name, _)| *name)
    }

    pub fn source(&self, name: &str) -> Result<String, ShaderError> {
        if let Some(source) = self.sources.get(name) {
            return Ok(source.clone());
        }
        if let Some(root) = &self.root {
            let path = root.join(name);
            if path.is_file() {
                return std::fs::read_to_string(&path).map_err(|e| {
                    log::error!("Failed to read shader {}: {}", path.display(), e);
                    ShaderError::MissingSource(name.to_string())
                });
            }
        }
        BUILTIN_SHADERS
            .iter()
            .find(|(builtin, _)| *builtin == name)
            .map(|(_, source)| source.to_string())
            .ok_or_else(|| ShaderError::MissingSource(name.to_string()))
    }

    /// Loads `name` and expands its includes.
    pub fn preprocessed(&self, name: &str) -> Result<String, ShaderError> {
        let source = self.source(name)?;
        preprocess(name, &source, &mut |include| self.source(include))
    }
}

/// Expands `#include "file"` directives.
///
/// Each file is included at most once per expansion; a file that includes
/// itself, directly or through others, is an error.
pub fn preprocess(
    name: &str,
    source: &str,
    resolve: &mut dyn FnMut(&str) -> Result<String, ShaderError>,
) -> Result<String, ShaderError> {
    let mut included = HashSet::new();
    let mut stack = vec![name.to_string()];
    included.insert(name.to_string());
    let mut out = String::with_capacity(source.len());
    expand(source, &mut stack, &mut included, resolve, &mut out)?;
    Ok(out)
}

fn expand(
    source: &str,
    stack: &mut Vec<String>,
    included: &mut HashSet<String>,
    resolve: &mut dyn FnMut(&str) -> Result<String, ShaderError>,
    out: &mut String,
) -> Result<(), ShaderError> {
    for line in source.lines() {
        let trimmed = line.trim();
        let Some(rest) = trimmed.strip_prefix("#include") else {
            out.push_str(line);
            out.push('\n');
            continue;
        };
        let file = parse_include_target(rest).ok_or_else(|| ShaderError::MalformedInclude {
            file: stack.last().cloned().unwrap_or_default(),
            line: trimmed.to_string(),
        })?;
        if stack.iter().any(|s| s == file) {
            let mut chain = stack.clone();
            chain.push(file.to_string());
            return Err(ShaderError::IncludeCycle(chain.join(" -> ")));
        }
        if !included.insert(file.to_string()) {
            continue;
        }
        let nested = resolve(file)?;
        stack.push(file.to_string());
        expand(&nested, stack, included, resolve, out)?;
        stack.pop();
    }
    Ok(())
}

fn parse_include_target(rest: &str) -> Option<&str> {
    let rest = rest.trim();
    let inner = rest
        .strip_prefix('"')
        .and_then(|r| r.strip_suffix('"'))
        .or_else(|| rest.strip_prefix('<').and_then(|r| r.strip_suffix('>')))?;
    (!inner.is_empty()).then_some(inner)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindingSlot {
    pub group: u32,
    pub binding: u32,
}

/// A preprocessed and validated stage file.
#[derive(Debug)]
struct CompiledSource {
    path: String,
    source: String,
}

/// Everything about a program that can be known without a GPU.
#[derive(Debug)]
pub struct ProgramReflection {
    sources: Vec<CompiledSource>,
    stages: HashMap<ShaderStage, usize>,
    bindings: HashMap<String, BindingSlot>,
}

impl ProgramReflection {
    /// Preprocesses, parses and validates every stage and collects the
    /// resource bindings of all of them.
    pub fn new(
        program: &str,
        library: &ShaderLibrary,
        stages: &[ShaderStageInfo],
    ) -> Result<Self, ShaderError> {
        let mut sources: Vec<CompiledSource> = Vec::new();
        let mut modules: Vec<naga::Module> = Vec::new();
        let mut stage_map = HashMap::new();
        let mut bindings: HashMap<String, BindingSlot> = HashMap::new();

        for info in stages {
            let index = match sources.iter().position(|s| s.path == info.path) {
                Some(index) => index,
                None => {
                    let source = library.preprocessed(&info.path)?;
                    let module = compile(program, &info.path, &source)?;
                    collect_bindings(&module, &mut bindings)?;
                    sources.push(CompiledSource {
                        path: info.path.clone(),
                        source,
                    });
                    modules.push(module);
                    sources.len() - 1
                }
            };
            let entry_point = info.stage.entry_point();
            let has_entry = modules[index]
                .entry_points
                .iter()
                .any(|ep| ep.name == entry_point && ep.stage == info.stage.naga_stage());
            if !has_entry {
                return Err(ShaderError::MissingEntryPoint {
                    path: info.path.clone(),
                    stage: info.stage,
                    entry_point,
                });
            }
            stage_map.insert(info.stage, index);
        }

        Ok(Self {
            sources,
            stages: stage_map,
            bindings,
        })
    }

    pub fn binding(&self, name: &str) -> Option<BindingSlot> {
        self.bindings.get(name).copied()
    }

    pub fn binding_names(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }
}

fn compile(program: &str, path: &str, source: &str) -> Result<naga::Module, ShaderError> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| ShaderError::Compile {
        program: program.to_string(),
        path: path.to_string(),
        message: e.emit_to_string(source),
    })?;
    // Only what every wgpu backend accepts without extra features.
    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::default(),
    )
    .validate(&module)
    .map_err(|e| ShaderError::Compile {
        program: program.to_string(),
        path: path.to_string(),
        message: e.into_inner().to_string(),
    })?;
    Ok(module)
}

fn collect_bindings(
    module: &naga::Module,
    bindings: &mut HashMap<String, BindingSlot>,
) -> Result<(), ShaderError> {
    for (_, var) in module.global_variables.iter() {
        let (Some(name), Some(binding)) = (&var.name, &var.binding) else {
            continue;
        };
        let slot = BindingSlot {
            group: binding.group,
            binding: binding.binding,
        };
        match bindings.get(name) {
            Some(first) if *first != slot => {
                return Err(ShaderError::BindingConflict {
                    name: name.clone(),
                    first: *first,
                    second: slot,
                });
            }
            _ => {
                bindings.insert(name.clone(), slot);
            }
        }
    }
    Ok(())
}

/// A compiled set of shader stages plus their reflected bindings.
#[derive(Debug)]
pub struct ShaderProgram {
    name: String,
    modules: Vec<wgpu::ShaderModule>,
    reflection: ProgramReflection,
}

impl ShaderProgram {
    pub fn new(
        device: &wgpu::Device,
        name: &str,
        library: &ShaderLibrary,
        stages: &[ShaderStageInfo],
    ) -> Result<Self, ShaderError> {
        let reflection = ProgramReflection::new(name, library, stages).inspect_err(|e| {
            log::error!("Failed to build shader program {}: {}", name, e);
        })?;
        let modules = reflection
            .sources
            .iter()
            .map(|compiled| {
                device.create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some(&format!("{} ({})", name, compiled.path)),
                    source: wgpu::ShaderSource::Wgsl(compiled.source.as_str().into()),
                })
            })
            .collect();
        log::debug!(
            "Shader program {} ready with {} bindings",
            name,
            reflection.bindings.len()
        );
        Ok(Self {
            name: name.to_string(),
            modules,
            reflection,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn module(&self, stage: ShaderStage) -> Result<&wgpu::ShaderModule, ShaderError> {
        self.reflection
            .stages
            .get(&stage)
            .map(|index| &self.modules[*index])
            .ok_or_else(|| ShaderError::MissingStage {
                program: self.name.clone(),
                stage,
            })
    }

    pub fn entry_point(&self, stage: ShaderStage) -> &'static str {
        stage.entry_point()
    }

    /// Looks up a resource by its WGSL name.
    pub fn binding(&self, name: &str) -> Option<BindingSlot> {
        let slot = self.reflection.binding(name);
        if slot.is_none() {
            log::warn!("{}: no binding named {}", self.name, name);
        }
        slot
    }

    /// Binding index of `name`, which must live in `group`.
    pub fn slot(&self, name: &str, group: u32) -> Result<u32, ShaderError> {
        match self.reflection.binding(name) {
            Some(slot) if slot.group == group => Ok(slot.binding),
            _ => Err(ShaderError::UnknownBinding {
                program: self.name.clone(),
                name: name.to_string(),
                group,
            }),
        }
    }

    pub fn bindings(&self) -> impl Iterator<Item = &str> {
        self.reflection.binding_names()
    }
}

/// A typed uniform buffer holding one `T`.
///
/// WGSL has no loose uniforms; values are grouped into structs and written
/// here with [`set`](Self::set) followed by [`write`](Self::write).
#[derive(Debug)]
pub struct UniformBuffer<T> {
    value: T,
    buffer: wgpu::Buffer,
    dirty: bool,
}

impl<T: bytemuck::Pod> UniformBuffer<T> {
    pub fn new(device: &wgpu::Device, label: &str, value: T) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::bytes_of(&value),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        Self {
            value,
            buffer,
            dirty: false,
        }
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    pub fn set(&mut self, value: T) {
        self.value = value;
        self.dirty = true;
    }

    pub fn update(&mut self, f: impl FnOnce(&mut T)) {
        f(&mut self.value);
        self.dirty = true;
    }

    /// Uploads the value if it changed since the last write.
    pub fn write(&mut self, queue: &wgpu::Queue) {
        if self.dirty {
            queue.write_buffer(&self.buffer, 0, bytemuck::bytes_of(&self.value));
            self.dirty = false;
        }
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    pub fn binding_resource(&self) -> wgpu::BindingResource<'_> {
        self.buffer.as_entire_binding()
    }
}
