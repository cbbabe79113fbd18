use super::errors::{Error, Result};

/// Config contains the parameters to create an unstable log.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// The index the first appended entry will occupy. When restarting a replica this is the
    /// last durable index plus one.
    pub offset: u64,

    /// Once the entries vector holds more than `shrink_multiple` times the capacity it needs,
    /// stabilizing entries releases the excess. `0` disables shrinking; `1` is rejected
    /// because it would reallocate on almost every stabilization.
    pub shrink_multiple: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            offset: 1,
            shrink_multiple: 2,
        }
    }
}

impl Config {
    /// Creates a new config starting at `offset`.
    pub fn new(offset: u64) -> Self {
        Self {
            offset,
            ..Self::default()
        }
    }

    /// Runs validations against the config.
    pub fn validate(&self) -> Result<()> {
        if self.shrink_multiple == 1 {
            return Err(Error::ConfigInvalid(
                "shrink multiple must be 0 (disabled) or greater than 1".to_owned(),
            ));
        }

        if self.offset == u64::MAX {
            return Err(Error::ConfigInvalid(format!(
                "offset {} leaves no room for any entry",
                self.offset
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::Config;
    use crate::Error;

    #[test]
    fn test_config_validate() {
        assert_eq!(Config::default().validate(), Ok(()));
        assert_eq!(Config::new(0).validate(), Ok(()));

        let tests = vec![
            (Config { shrink_multiple: 0, ..Config::new(5) }, true),
            (Config { shrink_multiple: 1, ..Config::new(5) }, false),
            (Config { shrink_multiple: 4, ..Config::new(5) }, true),
            (Config::new(u64::MAX), false),
        ];
        for (i, (c, wok)) in tests.into_iter().enumerate() {
            match c.validate() {
                Ok(()) => assert!(wok, "#{}: expect error", i),
                Err(Error::ConfigInvalid(_)) => assert!(!wok, "#{}: unexpected error", i),
                Err(e) => panic!("#{}: unexpected error kind {:?}", i, e),
            }
        }
    }
}
