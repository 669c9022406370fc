// Shared fixtures: fake extractor/transcriber scripts and pipeline configs
//
// Each fake tool is a POSIX shell script invoked as `sh <script>`, so the
// scripts never need to be executable.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use vidscribe::config::{PipelineConfig, ToolConfig, ToolsConfig};
use vidscribe::Pipeline;

pub const VIDEO_URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

/// A scratch area with separate directories for tool scripts and transient files
pub struct Fixture {
    _root: TempDir,
    pub tools_dir: PathBuf,
    pub work_dir: PathBuf,
}

impl Fixture {
    pub fn new() -> Self {
        let root = TempDir::new().expect("create temp dir");
        let tools_dir = root.path().join("tools");
        let work_dir = root.path().join("work");
        fs::create_dir_all(&tools_dir).unwrap();
        fs::create_dir_all(&work_dir).unwrap();
        Self {
            _root: root,
            tools_dir,
            work_dir,
        }
    }

    pub fn script(&self, name: &str, body: &str) -> PathBuf {
        let path = self.tools_dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        path
    }

    /// File holding one line per (non-probe) launch of a fake tool
    pub fn launch_log(&self, name: &str) -> PathBuf {
        self.tools_dir.join(format!("{}.launches", name))
    }

    pub fn work_files(&self) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(&self.work_dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    pub fn pipeline(&self, extractor: ToolConfig, transcriber: ToolConfig) -> Pipeline {
        self.pipeline_with(extractor, transcriber, |_| {})
    }

    pub fn pipeline_with(
        &self,
        extractor: ToolConfig,
        transcriber: ToolConfig,
        tweak: impl FnOnce(&mut PipelineConfig),
    ) -> Pipeline {
        let mut config = PipelineConfig {
            work_dir: Some(self.work_dir.clone()),
            probe_timeout_secs: 5,
            extract_timeout_secs: 10,
            transcribe_timeout_secs: 10,
            ..PipelineConfig::default()
        };
        tweak(&mut config);
        Pipeline::new(
            config,
            &ToolsConfig {
                extractor,
                transcriber,
            },
        )
    }
}

pub fn launches(path: &Path) -> usize {
    fs::read_to_string(path)
        .map(|s| s.lines().count())
        .unwrap_or(0)
}

/// Tool config whose forms run the given scripts through `sh`
pub fn sh_tool(name: &str, probe_arg: &str, scripts: &[PathBuf]) -> ToolConfig {
    ToolConfig {
        name: name.to_string(),
        probe_args: vec![probe_arg.to_string()],
        forms: scripts
            .iter()
            .map(|s| vec!["sh".to_string(), s.to_string_lossy().into_owned()])
            .collect(),
        library_module: None,
        interpreters: Vec::new(),
        install_hint: format!("Please install {}", name),
    }
}

/// Extractor that writes `audio_<session>.wav` of `size_bytes` bytes
pub fn extractor_script(fx: &Fixture, name: &str, size_bytes: u64) -> PathBuf {
    let log = fx.launch_log(name);
    fx.script(
        name,
        &format!(
            r#"
if [ "$1" = "--version" ]; then echo "2024.08.06"; exit 0; fi
echo run >> "{log}"
out=""
while [ $# -gt 0 ]; do
  if [ "$1" = "--output" ]; then out="$2"; shift; fi
  shift
done
file=$(printf '%s' "$out" | sed 's/%(ext)s/wav/')
echo "[download] Destination: $file"
dd if=/dev/zero of="$file" bs=1 count=0 seek={size_bytes} 2>/dev/null
printf 'RIFF' | dd of="$file" conv=notrunc 2>/dev/null
echo "[ExtractAudio] done"
"#,
            log = log.display(),
            size_bytes = size_bytes,
        ),
    )
}

/// Extractor that passes its probe but fails every real run
pub fn failing_extractor_script(fx: &Fixture, name: &str) -> PathBuf {
    let log = fx.launch_log(name);
    fx.script(
        name,
        &format!(
            r#"
if [ "$1" = "--version" ]; then echo "2024.08.06"; exit 0; fi
echo run >> "{log}"
echo "ERROR: unable to download video data"
exit 1
"#,
            log = log.display(),
        ),
    )
}

/// Transcriber writing `<audio base>.txt` into `--output_dir`.
/// `@BASE@` in `text` is replaced with the audio base name.
pub fn transcriber_script(fx: &Fixture, name: &str, text: &str) -> PathBuf {
    let log = fx.launch_log(name);
    fx.script(
        name,
        &format!(
            r#"
if [ "$1" = "--help" ]; then echo "usage: whisper audio"; exit 0; fi
echo run >> "{log}"
audio="$1"
dir=""
while [ $# -gt 0 ]; do
  if [ "$1" = "--output_dir" ]; then dir="$2"; shift; fi
  shift
done
base=$(basename "$audio")
base="${{base%.*}}"
echo "Detecting language using up to the first 30 seconds."
printf '%s' "{text}" | sed "s/@BASE@/$base/g" > "$dir/$base.txt"
"#,
            log = log.display(),
            text = text,
        ),
    )
}

/// Transcriber that prints a line and then never finishes
pub fn hanging_transcriber_script(fx: &Fixture, name: &str) -> PathBuf {
    let log = fx.launch_log(name);
    fx.script(
        name,
        &format!(
            r#"
if [ "$1" = "--help" ]; then exit 0; fi
echo run >> "{log}"
echo "Loading model base"
exec sleep 30
"#,
            log = log.display(),
        ),
    )
}
