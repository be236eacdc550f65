use std::{
  env, fs,
  io::{self, BufRead, BufReader, Read},
  path::{Path, PathBuf},
};

const ENV_FILE: &str = ".env";

/// A configuration `T` built from `KEY=VALUE` pairs of the process environment or of `.env`
/// files.
#[derive(Debug)]
pub struct EnvVars<T>(T);

impl<T> EnvVars<T>
where
  T: FromVars,
{
  /// [`Self::from_process`] if it succeeds, otherwise [`Self::from_nearest_env_file`].
  #[inline]
  pub fn from_available() -> crate::Result<Self> {
    Self::from_process().or_else(|_| Self::from_nearest_env_file())
  }

  /// Parses literal `.env` contents. Mostly useful in tests.
  #[inline]
  pub fn from_env_data(data: &[u8]) -> crate::Result<Self> {
    Self::from_reader(data)
  }

  /// Parses the `.env` file located at `path`.
  #[inline]
  pub fn from_env_path<P>(path: P) -> crate::Result<Self>
  where
    P: AsRef<Path>,
  {
    Self::from_reader(fs::File::open(path)?)
  }

  /// Constructs `T` from `vars`. Mostly useful in tests.
  #[inline]
  pub fn from_iterator(vars: impl IntoIterator<Item = (String, String)>) -> crate::Result<Self> {
    Ok(Self(T::from_vars(vars)?))
  }

  /// Walks from the current directory towards the root and parses the first `.env` file found.
  #[inline]
  pub fn from_nearest_env_file() -> crate::Result<Self> {
    let path = nearest_file(&env::current_dir()?, ENV_FILE)?;
    Self::from_env_path(path)
  }

  /// Every variable of the current process.
  #[inline]
  pub fn from_process() -> crate::Result<Self> {
    Self::from_iterator(env::vars())
  }

  /// Built configuration.
  #[inline]
  pub fn finish(self) -> T {
    self.0
  }

  fn from_reader(read: impl Read) -> crate::Result<Self> {
    Self::from_iterator(env_pairs(read)?)
  }
}

/// Types that can be assembled from `(name, value)` pairs. Unknown names are ignored.
pub trait FromVars: Sized {
  /// Consumes `vars`.
  fn from_vars(vars: impl IntoIterator<Item = (String, String)>) -> crate::Result<Self>;
}

// Blank lines, comments and lines without `=` are skipped.
fn env_pairs(read: impl Read) -> crate::Result<Vec<(String, String)>> {
  let mut rslt = Vec::new();
  for line in BufReader::new(read).lines() {
    let line = line?;
    let trimmed = line.trim();
    if trimmed.starts_with('#') {
      continue;
    }
    let Some((name, value)) = trimmed.split_once('=') else {
      continue;
    };
    rslt.push((unquote(name), unquote(value)));
  }
  Ok(rslt)
}

fn nearest_file(start: &Path, name: &str) -> io::Result<PathBuf> {
  for dir in start.ancestors() {
    let candidate = dir.join(name);
    match fs::metadata(&candidate) {
      Ok(elem) if elem.is_file() => return Ok(candidate),
      Ok(_) => {}
      Err(err) if err.kind() == io::ErrorKind::NotFound => {}
      Err(err) => return Err(err),
    }
  }
  Err(io::Error::new(io::ErrorKind::NotFound, "`.env` file not found"))
}

fn unquote(str: &str) -> String {
  let trimmed = str.trim();
  let quoted = |quote: char| trimmed.strip_prefix(quote).and_then(|el| el.strip_suffix(quote));
  quoted('\'').or_else(|| quoted('"')).unwrap_or(trimmed).into()
}
