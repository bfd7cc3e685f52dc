use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Quit,
    MoveDown,
    MoveUp,
    Open,
    Back,
    PrevNotice,
    NextNotice,
    PrevImage,
    NextImage,
    NextCategory,
    PrevCategory,
    AllCategories,
    Reload,
    ToggleHelp,
    Noop,
}

pub fn map_key(key: KeyEvent) -> KeyAction {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return KeyAction::Quit;
    }
    match key.code {
        KeyCode::Char('q') => KeyAction::Quit,
        KeyCode::Char('j') | KeyCode::Down => KeyAction::MoveDown,
        KeyCode::Char('k') | KeyCode::Up => KeyAction::MoveUp,
        KeyCode::Enter => KeyAction::Open,
        KeyCode::Esc | KeyCode::Char('b') | KeyCode::Backspace => KeyAction::Back,
        KeyCode::Char('h') | KeyCode::Left => KeyAction::PrevNotice,
        KeyCode::Char('l') | KeyCode::Right => KeyAction::NextNotice,
        KeyCode::Char('[') => KeyAction::PrevImage,
        KeyCode::Char(']') => KeyAction::NextImage,
        KeyCode::Tab => KeyAction::NextCategory,
        KeyCode::BackTab => KeyAction::PrevCategory,
        KeyCode::Char('a') => KeyAction::AllCategories,
        KeyCode::Char('r') => KeyAction::Reload,
        KeyCode::Char('?') => KeyAction::ToggleHelp,
        _ => KeyAction::Noop,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn vi_keys_and_arrows_agree() {
        assert_eq!(map_key(key(KeyCode::Char('j'))), map_key(key(KeyCode::Down)));
        assert_eq!(map_key(key(KeyCode::Char('k'))), map_key(key(KeyCode::Up)));
        assert_eq!(map_key(key(KeyCode::Char('h'))), KeyAction::PrevNotice);
        assert_eq!(map_key(key(KeyCode::Right)), KeyAction::NextNotice);
    }

    #[test]
    fn back_and_quit() {
        assert_eq!(map_key(key(KeyCode::Esc)), KeyAction::Back);
        assert_eq!(map_key(key(KeyCode::Char('b'))), KeyAction::Back);
        assert_eq!(map_key(key(KeyCode::Char('q'))), KeyAction::Quit);
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(map_key(ctrl_c), KeyAction::Quit);
    }

    #[test]
    fn category_and_image_keys() {
        assert_eq!(map_key(key(KeyCode::Tab)), KeyAction::NextCategory);
        let back_tab = KeyEvent::new(KeyCode::BackTab, KeyModifiers::SHIFT);
        assert_eq!(map_key(back_tab), KeyAction::PrevCategory);
        assert_eq!(map_key(key(KeyCode::Char('a'))), KeyAction::AllCategories);
        assert_eq!(map_key(key(KeyCode::Char('['))), KeyAction::PrevImage);
        assert_eq!(map_key(key(KeyCode::Char(']'))), KeyAction::NextImage);
    }

    #[test]
    fn unbound_keys_are_noop() {
        assert_eq!(map_key(key(KeyCode::Char('z'))), KeyAction::Noop);
        assert_eq!(map_key(key(KeyCode::F(1))), KeyAction::Noop);
    }
}
