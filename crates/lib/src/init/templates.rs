//! Template content for `stagehand init`.

/// Default `stagehand.toml`. Parses to the built-in defaults.
pub const CONFIG_TEMPLATE: &str = r##"# stagehand pipeline configuration.
#
# Every key is optional; removing one falls back to the value shown here.

# Upper bound for each external command, in seconds.
# stage_timeout_secs = 3600

[deps]
repositories = ["ppa:ubuntu-toolchain-r/test"]
packages = [
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

[source]
url = "https://github.com/supercollider/supercollider.git"
# Must name an existing tag; checkout fails before anything is compiled otherwise.
revision = "Version-3.9.3"
# Relative to the build directory.
checkout_dir = "supercollider"
cmake_flags = [
  "-DCMAKE_BUILD_TYPE=Release",
  "-DSC_EL=OFF",
  "-DSC_IDE=OFF",
  "-DSC_QT=OFF",
  "-DSUPERNOVA=OFF",
]
# Defaults to the number of available CPUs.
# jobs = 4

[smoke]
binary = "scsynth"
version_flag = "-v"

[audio]
asoundrc = "~/.asoundrc"
modprobe_conf = "/etc/modprobe.d/sound.conf"
module = "snd-dummy"
card_index = 0
rollback_on_failure = true

[test]
python = "python"
probe = """
import supriya
server = supriya.Server().boot()
print(server)
server.quit()
"""
runner = "pytest"
durations = 20
timeout_secs = 60
targets = ["tests/", "supriya/"]
"##;
