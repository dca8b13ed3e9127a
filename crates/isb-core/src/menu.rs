//! Static menu tree shown to visitors, plus the admin console keyboard.

use crate::{
    messaging::types::{InlineButton, InlineKeyboard},
    moderation::ModerationAction,
};

pub const UNKNOWN_COMMAND_NOTICE: &str = "Извините, но я не знаю такой команды...";

pub const CONSOLE_TITLE: &str = "Выбирайте функцию:";

const START_TEXT: &str = "Привет, это компьютерная школа \"Инфосфера\"!)\n\n\
В нашей школе дети осваивают компьютерные технологии на профессиональном уровне. Обучение в школе \
поможет воспитать у детей информационную культуру, развить системное мышление и научиться решать \
задачи творчески.\n\n\
Сейчас успешно обучаются более 600 детей от 6 до 12 лет по следующим направлениям:\n\n\
● Информатика\n\
● Информационные технологии\n\
● Робототехника\n\
● Программирование\n\
● Компьютерная графика\n\n\
Квалифицированные педагоги-практики помогут ребятам реализовать творческий потенциал и воплотить в \
жизнь свои уникальные идеи и замыслы!";

const PROGRAMMES_TEXT: &str = "Какую траекторию Вы хотите изучить:\n\
● Подготовительная\n\
● Байтик\n\
● Инфомиры\n\
● Инфостарт";

const FAQ_TEXT: &str = "Выберите, интересующий Вас вопрос:";

const PREP_TEXT: &str = "Развитие логического и образного мышления.\n\n\
Творчество в мультимедийных адаптированных программах (Музыкальный конструктор MAGIX MUSIC MAKER, \
Audacity, Фантазеры), знакомство с компьютером, работа с микрофоном и устройствами ввода текстовой \
информации, конструирование";

const BYTIK_TEXT: &str = "Знакомство с компьютером и робототехникой.\n\n\
Робототехника, создание мультфильмов с озвучкой в команде, изучение приемов форматирования текста \
в простых текстовых редакторах, работа в графическом редакторе Paint.";

const INFOMIRY_TEXT: &str = "Продвинутые навыки работы в Microsoft Office, основы программирования \
и робототехники.\n\
Длится ступень 3 года: Инфомиры-1, Инфомиры-2, Инфомиры-3\n\n\
Изучение устройств компьютера и организации файлового пространства, освоение основных \
алгоритмических конструкций, программирования и конструирования роботов, создание профессиональных \
презентаций и текстовых документов.";

const INFOSTART_TEXT: &str = "● Инфостарт-0 (5 класс)\n\n\
Поступают ребята, которые до этого у нас не учились.\n\
На этом курсе дети познакомятся с работой в графическом редакторе Figma, попробуют сверстать \
сайты, научатся конструировать роботов и программировать их.\n\n\
Модульный интегрированный курс «Инфостарт-0» поможет тем, кто только что познакомился с \
Инфосферой, определится с интересами в IT - области и направлением дальнейшего обучения.\n\n\
● Инфостарт (6, 7 класс)\n\n\
Первое знакомство с профессиональными средами в компьютерном дизайне, программировании и системном \
администрировании.\n\n\
На этой ступени дети знакомятся с векторной и растровой графикой в программах СorelDraw и \
Photoshop, изучают робототехнику на конструкторах, Arduino, верстают сайты на HTML.\n\
«Инфостарт» поможет тем, кто только что познакомился с Инфосферой и хочет продвинуться в области \
IT.\n";

const FAQ_ANSWERS: [(&str, &str); 5] = [
    ("start_3_1", "Да, принимаем, но при прохождении тестирования."),
    (
        "start_3_2",
        "Ручка, карандаш, ластик, папка-скоросшиватель, флеш - накопитель. И желание учиться. :)",
    ),
    (
        "start_3_3",
        "Для выполнения домашних заданий компьютер будет необходим на ступени обучения «Инфомиры». \
Если дома компьютер отсутствует либо сломался, то ребенок может приходить в компьютерную школу \
«Инфосфера» и заниматься за свободным компьютером.",
    ),
    (
        "start_3_4",
        "Расписание компьютерной школы составлено таким образом, что дети приходят в Инфосферу 2-3 \
раза в неделю в зависимости от возраста и ступени обучения. Длительность занятий – 45 минут. 10 \
минут перемена. Занятия в компьютерной школе «Инфосфера» проводятся и в первую, и во вторую смену.",
    ),
    (
        "start_3_5",
        "Вы можете задать любой интересующий Вас вопрос по телефону: +7 (904) 056-72-88",
    ),
];

const PROGRAMMES: [(&str, &str, &str, &str); 4] = [
    ("start_1_1", "Подготовительная (1 класс)", "start_1_1.jpg", PREP_TEXT),
    ("start_1_2", "Байтик (2 класс)", "start_1_2.jpg", BYTIK_TEXT),
    ("start_1_3", "Инфомиры (3-4 класс)", "start_1_3.jpg", INFOMIRY_TEXT),
    ("start_1_4", "Инфостарт (5-7 класс)", "start_1_4.jpg", INFOSTART_TEXT),
];

const FAQ_LABELS: [&str; 5] = [
    "Принимаете ли в школу 6-леток?",
    "Что необходимо для учёбы в школе?",
    "Нужен ли дома компьютер?",
    "Режим обучения",
    "Другой вопрос",
];

/// One outbound message: a photo with caption when `photo` is set, plain
/// text otherwise.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Screen {
    pub text: &'static str,
    /// File name inside the pictures dir.
    pub photo: Option<&'static str>,
    pub keyboard: Option<InlineKeyboard>,
}

impl Screen {
    fn text(text: &'static str) -> Self {
        Self {
            text,
            photo: None,
            keyboard: None,
        }
    }

    fn photo(text: &'static str, photo: &'static str) -> Self {
        Self {
            text,
            photo: Some(photo),
            keyboard: None,
        }
    }

    fn with_keyboard(mut self, keyboard: InlineKeyboard) -> Self {
        self.keyboard = Some(keyboard);
        self
    }
}

/// Greeting screen for `/start` and greetings.
pub fn start_screen(enroll_url: &str) -> Screen {
    Screen::photo(START_TEXT, "start.jpg").with_keyboard(InlineKeyboard::new(vec![
        InlineButton::callback("О направлениях", "start_1"),
        InlineButton::url("Записаться на пробное занятие", enroll_url),
        InlineButton::callback("Часто задаваемые вопросы", "start_3"),
    ]))
}

/// Admin action keyboard for `/console`.
pub fn console_screen() -> Screen {
    let buttons = ModerationAction::ALL
        .into_iter()
        .map(|a| InlineButton::callback(a.label(), a.command()))
        .collect();
    Screen::text(CONSOLE_TITLE).with_keyboard(InlineKeyboard::new(buttons))
}

/// Screen selected by visitor callback data. `None` for unknown data.
pub fn screen_for(data: &str) -> Option<Screen> {
    match data {
        "start_1" => {
            let buttons = PROGRAMMES
                .iter()
                .map(|(data, label, _, _)| InlineButton::callback(*label, *data))
                .collect();
            Some(
                Screen::photo(PROGRAMMES_TEXT, "start_1.jpg")
                    .with_keyboard(InlineKeyboard::new(buttons)),
            )
        }
        "start_3" => {
            let buttons = FAQ_ANSWERS
                .iter()
                .zip(FAQ_LABELS)
                .map(|((data, _), label)| InlineButton::callback(label, *data))
                .collect();
            Some(Screen::text(FAQ_TEXT).with_keyboard(InlineKeyboard::new(buttons)))
        }
        _ => {
            if let Some((_, _, photo, text)) = PROGRAMMES.iter().find(|(d, ..)| *d == data) {
                return Some(Screen::photo(*text, *photo));
            }
            FAQ_ANSWERS
                .iter()
                .find(|(d, _)| *d == data)
                .map(|(_, answer)| Screen::text(*answer))
        }
    }
}
