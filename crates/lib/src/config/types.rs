//! Pipeline configuration types.
//!
//! Every field has a built-in default so an empty (or absent) config file
//! reproduces the stock CI provisioning run.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Complete pipeline configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
  /// Upper bound for each external command, in seconds. `None` waits forever.
  pub stage_timeout_secs: Option<u64>,
  pub deps: DepsConfig,
  pub source: SourceConfig,
  pub smoke: SmokeConfig,
  pub audio: AudioConfig,
  pub test: TestConfig,
}

/// System packages and the repositories they come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DepsConfig {
  /// Repository specs passed to `add-apt-repository`.
  pub repositories: Vec<String>,
  /// Packages passed to `apt-get install`.
  pub packages: Vec<String>,
}

impl Default for DepsConfig {
  fn default() -> Self {
    Self {
      repositories: vec!["ppa:ubuntu-toolchain-r/test".to_string()],
      packages: [
        "build-essential",
        "cmake",
        "git",
        "pkg-config",
        "alsa-utils",
        "jackd2",
        "libasound2-dev",
        "libavahi-client-dev",
        "libfftw3-dev",
        "libicu-dev",
        "libjack-jackd2-dev",
        "libreadline6-dev",
        "libsndfile1-dev",
        "libudev-dev",
        "libxt-dev",
      ]
      .into_iter()
      .map(String::from)
      .collect(),
    }
  }
}

/// Upstream source of the synthesis server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceConfig {
  pub url: String,
  /// Pinned tag checked out before building.
  pub revision: String,
  /// Checkout directory, relative to the build directory.
  pub checkout_dir: PathBuf,
  pub cmake_flags: Vec<String>,
  /// `make -j` value. Defaults to the available parallelism.
  pub jobs: Option<usize>,
}

impl Default for SourceConfig {
  fn default() -> Self {
    Self {
      url: "https://github.com/supercollider/supercollider.git".to_string(),
      revision: "Version-3.9.3".to_string(),
      checkout_dir: PathBuf::from("supercollider"),
      cmake_flags: [
        "-DCMAKE_BUILD_TYPE=Release",
        "-DSC_EL=OFF",
        "-DSC_IDE=OFF",
        "-DSC_QT=OFF",
        "-DSUPERNOVA=OFF",
      ]
      .into_iter()
      .map(String::from)
      .collect(),
      jobs: None,
    }
  }
}

/// Post-install version check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SmokeConfig {
  pub binary: String,
  pub version_flag: String,
}

impl Default for SmokeConfig {
  fn default() -> Self {
    Self {
      binary: "scsynth".to_string(),
      version_flag: "-v".to_string(),
    }
  }
}

/// Virtual sound card registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AudioConfig {
  /// Sound-server user config. A leading `~` expands to `$HOME`.
  pub asoundrc: PathBuf,
  /// Kernel-module alias config. Written with elevated privileges.
  pub modprobe_conf: PathBuf,
  /// Kernel module backing the virtual card.
  pub module: String,
  pub card_index: u32,
  /// Restore both config files if a later audio step fails.
  pub rollback_on_failure: bool,
}

impl Default for AudioConfig {
  fn default() -> Self {
    Self {
      asoundrc: PathBuf::from("~/.asoundrc"),
      modprobe_conf: PathBuf::from("/etc/modprobe.d/sound.conf"),
      module: "snd-dummy".to_string(),
      card_index: 0,
      rollback_on_failure: true,
    }
  }
}

impl AudioConfig {
  /// Block registering the virtual card as the default PCM and control device.
  pub fn asoundrc_block(&self) -> String {
    format!(
      "pcm.!default {{\n  type hw\n  card {index}\n}}\nctl.!default {{\n  type hw\n  card {index}\n}}\n",
      index = self.card_index
    )
  }

  /// Block aliasing the card slot to the virtual card module.
  pub fn modprobe_block(&self) -> String {
    format!(
      "alias snd-card-{index} {module}\noptions {module} index={index}\n",
      index = self.card_index,
      module = self.module
    )
  }
}

/// Default liveness probe: boot a server through the client library, print it, stop it.
pub const DEFAULT_PROBE: &str = "import supriya\nserver = supriya.Server().boot()\nprint(server)\nserver.quit()\n";

/// Liveness probe and test-suite invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TestConfig {
  pub python: String,
  /// Inline script run with `python -c`.
  pub probe: String,
  pub runner: String,
  /// Number of slowest tests reported.
  pub durations: u32,
  /// Per-test timeout in seconds.
  pub timeout_secs: u64,
  pub targets: Vec<String>,
}

impl Default for TestConfig {
  fn default() -> Self {
    Self {
      python: "python".to_string(),
      probe: DEFAULT_PROBE.to_string(),
      runner: "pytest".to_string(),
      durations: 20,
      timeout_secs: 60,
      targets: vec!["tests/".to_string(), "supriya/".to_string()],
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn asoundrc_block_uses_card_index() {
    let audio = AudioConfig {
      card_index: 2,
      ..Default::default()
    };
    let block = audio.asoundrc_block();
    assert!(block.starts_with("pcm.!default {"));
    assert_eq!(block.matches("card 2").count(), 2);
    assert!(block.ends_with("}\n"));
  }

  #[test]
  fn modprobe_block_aliases_module() {
    let block = AudioConfig::default().modprobe_block();
    assert_eq!(block, "alias snd-card-0 snd-dummy\noptions snd-dummy index=0\n");
  }

  #[test]
  fn default_probe_boots_and_quits() {
    assert!(DEFAULT_PROBE.contains("boot()"));
    assert!(DEFAULT_PROBE.contains("quit()"));
  }
}
