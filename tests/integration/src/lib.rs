//! Cross-engine scenarios live under `tests/`.
