#![doc = include_str!("../README.md")]

mod mark;
pub use mark::Mark;

mod error;
pub use error::{MarkedError, Stage, Warning, WarningKind};

mod comment;
pub use comment::{Comment, CommentKind, comment_lines};

mod token;
pub use token::{
    Directive, ScalarStyle, ScalarToken, TagDirective, Token, TokenData, TokenKind, Version,
};

mod reader;
pub use reader::{Encoding, Reader, ReaderState};

mod scanner;
pub use scanner::Scanner;
