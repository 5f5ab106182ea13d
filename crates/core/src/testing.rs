// Small but real slice of CNAE 2.3 for tests

use crate::types::{CnaeEntity, Level};

const SECTIONS: [(&str, &str); 21] = [
    ("A", "AGRICULTURA, PECUÁRIA, PRODUÇÃO FLORESTAL, PESCA E AQÜICULTURA"),
    ("B", "INDÚSTRIAS EXTRATIVAS"),
    ("C", "INDÚSTRIAS DE TRANSFORMAÇÃO"),
    ("D", "ELETRICIDADE E GÁS"),
    ("E", "ÁGUA, ESGOTO, ATIVIDADES DE GESTÃO DE RESÍDUOS E DESCONTAMINAÇÃO"),
    ("F", "CONSTRUÇÃO"),
    ("G", "COMÉRCIO; REPARAÇÃO DE VEÍCULOS AUTOMOTORES E MOTOCICLETAS"),
    ("H", "TRANSPORTE, ARMAZENAGEM E CORREIO"),
    ("I", "ALOJAMENTO E ALIMENTAÇÃO"),
    ("J", "INFORMAÇÃO E COMUNICAÇÃO"),
    ("K", "ATIVIDADES FINANCEIRAS, DE SEGUROS E SERVIÇOS RELACIONADOS"),
    ("L", "ATIVIDADES IMOBILIÁRIAS"),
    ("M", "ATIVIDADES PROFISSIONAIS, CIENTÍFICAS E TÉCNICAS"),
    ("N", "ATIVIDADES ADMINISTRATIVAS E SERVIÇOS COMPLEMENTARES"),
    ("O", "ADMINISTRAÇÃO PÚBLICA, DEFESA E SEGURIDADE SOCIAL"),
    ("P", "EDUCAÇÃO"),
    ("Q", "SAÚDE HUMANA E SERVIÇOS SOCIAIS"),
    ("R", "ARTES, CULTURA, ESPORTE E RECREAÇÃO"),
    ("S", "OUTRAS ATIVIDADES DE SERVIÇOS"),
    ("T", "SERVIÇOS DOMÉSTICOS"),
    ("U", "ORGANISMOS INTERNACIONAIS E OUTRAS INSTITUIÇÕES EXTRATERRITORIAIS"),
];

const DIVISIONS: [(&str, &str, &str); 7] = [
    ("01", "AGRICULTURA, PECUÁRIA E SERVIÇOS RELACIONADOS", "A"),
    ("02", "PRODUÇÃO FLORESTAL", "A"),
    ("03", "PESCA E AQÜICULTURA", "A"),
    ("10", "FABRICAÇÃO DE PRODUTOS ALIMENTÍCIOS", "C"),
    ("36", "CAPTAÇÃO, TRATAMENTO E DISTRIBUIÇÃO DE ÁGUA", "E"),
    ("47", "COMÉRCIO VAREJISTA", "G"),
    ("56", "ALIMENTAÇÃO", "I"),
];

const GROUPS: [(&str, &str, &str); 6] = [
    ("011", "PRODUÇÃO DE LAVOURAS TEMPORÁRIAS", "01"),
    ("031", "PESCA", "03"),
    ("109", "FABRICAÇÃO DE OUTROS PRODUTOS ALIMENTÍCIOS", "10"),
    ("360", "CAPTAÇÃO, TRATAMENTO E DISTRIBUIÇÃO DE ÁGUA", "36"),
    ("472", "COMÉRCIO VAREJISTA DE PRODUTOS ALIMENTÍCIOS, BEBIDAS E FUMO", "47"),
    ("561", "RESTAURANTES E OUTROS SERVIÇOS DE ALIMENTAÇÃO E BEBIDAS", "56"),
];

const CLASSES: [(&str, &str, &str); 6] = [
    ("01113", "CULTIVO DE CEREAIS", "011"),
    ("03116", "PESCA EM ÁGUA SALGADA", "031"),
    ("10911", "FABRICAÇÃO DE PRODUTOS DE PANIFICAÇÃO", "109"),
    ("36006", "CAPTAÇÃO, TRATAMENTO E DISTRIBUIÇÃO DE ÁGUA", "360"),
    (
        "47211",
        "COMÉRCIO VAREJISTA DE PRODUTOS DE PADARIA, LATICÍNIO, DOCES, BALAS E SEMELHANTES",
        "472",
    ),
    (
        "56112",
        "RESTAURANTES E OUTROS ESTABELECIMENTOS DE SERVIÇOS DE ALIMENTAÇÃO E BEBIDAS",
        "561",
    ),
];

const SUBCLASSES: [(&str, &str, &str); 9] = [
    ("0111301", "Cultivo de arroz", "01113"),
    ("0111302", "Cultivo de milho", "01113"),
    ("0311601", "Pesca de peixes em água salgada", "03116"),
    ("1091101", "Fabricação de produtos de panificação industrial", "10911"),
    (
        "1091102",
        "Fabricação de produtos de padaria e confeitaria com predominância de produção própria",
        "10911",
    ),
    ("3600601", "Captação, tratamento e distribuição de água", "36006"),
    ("4721102", "Padaria e confeitaria com predominância de revenda", "47211"),
    ("4721103", "Comércio varejista de laticínios e frios", "47211"),
    ("5611201", "Restaurantes e similares", "56112"),
];

/// Every record of the sample, all levels mixed
pub fn sample_taxonomy() -> Vec<CnaeEntity> {
    let mut entities: Vec<CnaeEntity> = SECTIONS
        .iter()
        .map(|(code, description)| CnaeEntity::section(*code, *description))
        .collect();

    for (level, rows) in [
        (Level::Division, &DIVISIONS[..]),
        (Level::Group, &GROUPS[..]),
        (Level::Class, &CLASSES[..]),
        (Level::Subclass, &SUBCLASSES[..]),
    ] {
        entities.extend(
            rows.iter()
                .map(|(code, description, parent)| CnaeEntity::child_of(level, *code, *description, *parent)),
        );
    }

    entities
}
