use thiserror::Error;

const HARDENED: u32 = 0x8000_0000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("derivation path must start with 'm'")]
    MissingRoot,
    #[error("invalid derivation path component '{0}'")]
    InvalidComponent(String),
}

/// Parse a derivation path string like "m/44'/0'/0'/0/0" into a Vec<u32>.
/// Components ending in `'` or `h` are hardened.
pub fn parse_derivation_path(path: &str) -> Result<Vec<u32>, PathError> {
    let rest = path.strip_prefix('m').ok_or(PathError::MissingRoot)?;
    if rest.is_empty() || rest == "/" {
        return Ok(vec![]);
    }
    let rest = rest
        .strip_prefix('/')
        .ok_or_else(|| PathError::InvalidComponent(rest.to_owned()))?;

    rest.split('/')
        .map(|component| {
            let (number, hardened) = match component
                .strip_suffix('\'')
                .or_else(|| component.strip_suffix('h'))
            {
                Some(number) => (number, true),
                None => (component, false),
            };
            let index: u32 = number
                .parse()
                .map_err(|_| PathError::InvalidComponent(component.to_owned()))?;
            if index >= HARDENED {
                return Err(PathError::InvalidComponent(component.to_owned()));
            }
            Ok(if hardened { index | HARDENED } else { index })
        })
        .collect()
}
